pub mod rejection_report;
pub mod ticket_export;

use rust_xlsxwriter::{
    ConditionalFormatText, ConditionalFormatTextRule, Format, FormatBorder, Worksheet, XlsxError,
};

use crate::error::AppError;

pub(crate) fn xlsx_err(e: XlsxError) -> AppError {
    AppError::Custom(e.to_string())
}

/// Header row: dark blue fill, white bold text, thin border.
pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_font_size(11)
        .set_border(FormatBorder::Thin)
        .set_text_wrap()
}

pub fn create_date_format() -> Format {
    Format::new().set_num_format("yyyy-mm-dd hh:mm")
}

pub fn create_integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

pub fn create_percent_format() -> Format {
    Format::new().set_num_format("0.0%")
}

/// Write a header row at `row` with the header format.
pub fn write_header_row(ws: &mut Worksheet, row: u32, headers: &[&str]) -> Result<(), XlsxError> {
    let hdr = create_header_format();
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(row, col as u16, *h, &hdr)?;
    }
    Ok(())
}

/// Red fill on cells of column `col` containing `error_text`, amber on `warning_text`.
pub fn apply_severity_highlight(
    ws: &mut Worksheet,
    first_row: u32,
    col: u16,
    last_row: u32,
    error_text: &str,
    warning_text: Option<&str>,
) -> Result<(), XlsxError> {
    let red = Format::new()
        .set_background_color("FFC7CE")
        .set_font_color("9C0006");
    let amber = Format::new()
        .set_background_color("FFEB9C")
        .set_font_color("9C6500");

    ws.add_conditional_format(
        first_row,
        col,
        last_row,
        col,
        &ConditionalFormatText::new()
            .set_rule(ConditionalFormatTextRule::Contains(error_text.to_string()))
            .set_format(&red),
    )?;
    if let Some(text) = warning_text {
        ws.add_conditional_format(
            first_row,
            col,
            last_row,
            col,
            &ConditionalFormatText::new()
                .set_rule(ConditionalFormatTextRule::Contains(text.to_string()))
                .set_format(&amber),
        )?;
    }

    Ok(())
}
