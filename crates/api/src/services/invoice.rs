//! Invoice PDF rendering.
//!
//! Uses printpdf's built-in Helvetica fonts, so all text stays within
//! WinAnsi and amounts are labelled `GBP` rather than with a pound sign.
//! Rendering is synchronous and CPU bound: run it on the blocking pool.

use std::ops::Range;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use thiserror::Error;

use exprz_core::{CURRENCY_CODE, format_amount};

use crate::config::EmailConfig;
use crate::models::order::OrderDetails;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 17.0;
const RIGHT: f32 = 193.0;
const ROW_HEIGHT: f32 = 7.0;

/// Item rows that fit under the header block on the first page.
const FIRST_PAGE_ROWS: usize = 22;
/// Item rows on each continuation page.
const NEXT_PAGE_ROWS: usize = 32;
/// Longest description kept in the table before truncation.
const MAX_DESCRIPTION_CHARS: usize = 52;

/// Column x offsets from `LEFT`: #, description, qty, price, amount.
const COLUMNS: [(&str, f32); 5] = [
    ("#", 0.0),
    ("Description", 10.0),
    ("Qty", 105.0),
    ("Price", 123.0),
    ("Amount", 148.0),
];

/// Errors from invoice rendering.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Shop identity printed at the top and bottom of every invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceHeader {
    pub shop_name: String,
    pub contact: String,
}

impl InvoiceHeader {
    #[must_use]
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            shop_name: config.from_name.clone(),
            contact: config
                .support_email
                .clone()
                .unwrap_or_else(|| config.from_address.clone()),
        }
    }
}

/// `Invoice_<invoice number>.pdf`.
#[must_use]
pub fn invoice_filename(invoice_number: &str) -> String {
    format!("Invoice_{invoice_number}.pdf")
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render the invoice for an order.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if the document cannot be built or serialized.
pub fn render_invoice(
    details: &OrderDetails,
    header: &InvoiceHeader,
) -> Result<Vec<u8>, InvoiceError> {
    let title = format!("Invoice {}", details.invoice_number);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    let pages = row_pages(details.items.len());
    let last = pages.len().saturating_sub(1);
    let mut layer = doc.get_page(page).get_layer(layer);

    for (index, rows) in pages.into_iter().enumerate() {
        if index > 0 {
            layer = new_page(&doc);
        }

        let table_top = if index == 0 {
            draw_header(&layer, &fonts, details, header)
        } else {
            text(&layer, &fonts.bold, 10.0, LEFT, 280.0, &format!("{title} (continued)"));
            272.0
        };

        let table_bottom = draw_table(&layer, &fonts, details, rows, table_top);

        if index == last {
            draw_summary(&layer, &fonts, details, table_bottom - 8.0);
        }
        draw_footer(&layer, &fonts, header);
    }

    Ok(doc.save_to_bytes()?)
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

/// Split `count` item rows into per-page index ranges. Always at least one page.
fn row_pages(count: usize) -> Vec<Range<usize>> {
    let mut pages = vec![0..count.min(FIRST_PAGE_ROWS)];
    let mut start = FIRST_PAGE_ROWS;

    while start < count {
        let end = (start + NEXT_PAGE_ROWS).min(count);
        pages.push(start..end);
        start = end;
    }
    pages
}

/// Cut long descriptions so they stay inside their column.
fn fit_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        return description.to_string();
    }
    let kept: String = description.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    format!("{kept}...")
}

fn money(amount: rust_decimal::Decimal) -> String {
    format!("{CURRENCY_CODE} {}", format_amount(amount))
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, size: f32, x: f32, y: f32, value: &str) {
    layer.use_text(value, size, Mm(x), Mm(y), font);
}

fn rule(layer: &PdfLayerReference, y: f32) {
    layer.set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(LEFT), Mm(y)), false),
            (Point::new(Mm(RIGHT), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn fill(layer: &PdfLayerReference, rgb: (f32, f32, f32), bottom: f32, top: f32) {
    layer.set_fill_color(Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None)));
    layer.add_rect(Rect::new(Mm(LEFT), Mm(bottom), Mm(RIGHT), Mm(top)));
}

fn black(layer: &PdfLayerReference) {
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
}

/// Draws shop header, title, metadata and the bill-to box. Returns the y
/// where the item table starts.
fn draw_header(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    details: &OrderDetails,
    header: &InvoiceHeader,
) -> f32 {
    black(layer);
    text(layer, &fonts.bold, 18.0, LEFT, 280.0, &header.shop_name);
    text(layer, &fonts.regular, 9.0, LEFT, 274.0, &header.contact);

    rule(layer, 266.0);
    text(layer, &fonts.bold, 16.0, 91.0, 258.0, "INVOICE");
    rule(layer, 253.0);

    let date = details.created_at.format("%d/%m/%Y").to_string();
    let left = [
        format!("Invoice #: {}", details.invoice_number),
        format!("Order #: {}", details.order_number),
        format!("Date: {date}"),
    ];
    let right = [
        format!("Payment Method: {}", details.payment_method.as_str().to_uppercase()),
        format!("User ID: {}", details.user_id),
        format!("Due Date: {date}"),
    ];
    let mut y = 245.0;
    for (l, r) in left.iter().zip(right.iter()) {
        text(layer, &fonts.regular, 10.0, LEFT, y, l);
        text(layer, &fonts.regular, 10.0, 110.0, y, r);
        y -= 5.5;
    }

    let address = &details.delivery_details;
    fill(layer, (0.95, 0.95, 0.95), 194.0, 226.0);
    black(layer);
    text(layer, &fonts.bold, 10.0, LEFT + 3.0, 220.0, "BILL TO:");
    let city_line = [address.city.as_str(), address.county.as_str(), address.postcode.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let lines = [
        address.full_name(),
        address.street_address.clone(),
        city_line,
        format!("Phone: {}", address.phone),
        format!(
            "Instructions: {}",
            address.delivery_instructions.as_deref().unwrap_or("N/A")
        ),
    ];
    let mut y = 215.0;
    for line in &lines {
        text(layer, &fonts.regular, 9.0, LEFT + 3.0, y, line);
        y -= 4.8;
    }

    184.0
}

/// Draws the header row and `rows` of the items. Returns the y below the table.
fn draw_table(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    details: &OrderDetails,
    rows: Range<usize>,
    top: f32,
) -> f32 {
    fill(layer, (0.17, 0.32, 0.51), top - ROW_HEIGHT, top);
    layer.set_fill_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
    for (label, offset) in COLUMNS {
        text(layer, &fonts.bold, 10.0, LEFT + offset + 2.0, top - 5.0, label);
    }

    let mut y = top - ROW_HEIGHT;
    for index in rows {
        let Some(item) = details.items.get(index) else {
            break;
        };
        if index % 2 == 1 {
            fill(layer, (0.94, 0.96, 0.99), y - ROW_HEIGHT, y);
        }
        black(layer);

        let cells = [
            (index + 1).to_string(),
            fit_description(&item.description()),
            item.quantity.to_string(),
            money(item.price),
            money(item.line_total()),
        ];
        for ((_, offset), cell) in COLUMNS.iter().zip(cells.iter()) {
            text(layer, &fonts.regular, 9.0, LEFT + offset + 2.0, y - 5.0, cell);
        }
        y -= ROW_HEIGHT;
    }

    rule(layer, y);
    y
}

fn draw_summary(layer: &PdfLayerReference, fonts: &Fonts, details: &OrderDetails, top: f32) {
    let label_x = 125.0;
    let value_x = 160.0;

    fill_box(layer, label_x - 3.0, top - 24.0, top + 4.0);
    black(layer);
    text(layer, &fonts.regular, 10.0, label_x, top - 2.0, "Subtotal:");
    text(layer, &fonts.regular, 10.0, value_x, top - 2.0, &money(details.totals.subtotal));
    text(layer, &fonts.regular, 10.0, label_x, top - 9.0, "Tax:");
    text(layer, &fonts.regular, 10.0, value_x, top - 9.0, &money(details.totals.tax));
    text(layer, &fonts.bold, 11.0, label_x, top - 18.0, "Total Amount:");
    text(layer, &fonts.bold, 11.0, value_x, top - 18.0, &money(details.totals.total));

    text(layer, &fonts.regular, 9.0, label_x, top - 32.0, "Thank you for your business!");
}

fn fill_box(layer: &PdfLayerReference, left: f32, bottom: f32, top: f32) {
    layer.set_fill_color(Color::Rgb(Rgb::new(0.95, 0.95, 0.95, None)));
    layer.add_rect(Rect::new(Mm(left), Mm(bottom), Mm(RIGHT), Mm(top)));
}

fn draw_footer(layer: &PdfLayerReference, fonts: &Fonts, header: &InvoiceHeader) {
    black(layer);
    rule(layer, 20.0);
    text(layer, &fonts.regular, 8.0, LEFT, 15.0, &header.shop_name);
    text(
        layer,
        &fonts.regular,
        8.0,
        LEFT,
        11.0,
        "Cash on delivery orders are paid in full to the courier on receipt.",
    );
}
