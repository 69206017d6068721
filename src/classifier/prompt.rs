/// Labels the model may choose from.
pub const KNOWN_DOCUMENT_TYPES: &[&str] = &[
    "Receipt Memo",
    "Cement Issue",
    "Diesel Issue",
    "Goods Received Note",
    "Oil Issue",
    "Delivery Challan",
    "Unknown",
];

pub fn classification_prompt() -> String {
    let types = KNOWN_DOCUMENT_TYPES
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Analyze the provided document image. Identify the document type, its serial number and the site where it was issued.

## Document type
Choose exactly one of: {types}.

## Serial number
Use the most prominent identification number on the form.
- For 'Goods Received Note', use the 'GRN No.'.
- For 'Delivery Challan', use the number after '(MTS)'.
- For 'Diesel Issue', use the 'S.No.'.
- For 'Receipt Memo', use the main memo number (e.g. 58653).
- If no clear serial number is found, use the value 'N/A'.

## Site
The site is usually handwritten in a field or box set aside for it. It is typically one of ATR, MRS, WTP, STP, NSTP, KOY, KOD or PY, often followed by a number such as 60, 54, 120, 110 or 48. Use 'N/A' if there is none.

## Output
Return a single raw JSON object with exactly three keys: "documentType", "serialNumber" and "site". Do not add any other text, formatting or markdown."#
    )
}
