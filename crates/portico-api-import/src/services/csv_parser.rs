//! CSV parsing for bulk user import.
//!
//! The file is fully buffered into `ImportUser` records before any batch is
//! submitted. Header row is required; hash and salt columns are base64 text
//! decoded into raw bytes; `email_verified` is true only for the literal
//! text `true`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use portico_identity::ImportUser;

/// Maximum CSV upload size (10 MiB).
pub const MAX_CSV_SIZE: usize = 10 * 1024 * 1024;

/// Required header columns, in any order.
const REQUIRED_HEADERS: [&str; 5] = [
    "uid",
    "email",
    "email_verified",
    "password_hash",
    "password_salt",
];

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip a UTF-8 BOM if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Parse a CSV file into import rows.
///
/// Any malformed row fails the whole parse; the importer submits nothing
/// for a file it could not fully decode.
pub fn parse_csv(data: &[u8]) -> Result<Vec<ImportUser>, String> {
    let data = strip_utf8_bom(data);
    if data.is_empty() {
        return Err("CSV file is empty".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {e}"))?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .filter(|h| !headers.iter().any(|got| got == *h))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required headers: {}", missing.join(", ")));
    }

    // Cannot fail: every required header was verified present above.
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let uid_col = column("uid");
    let email_col = column("email");
    let verified_col = column("email_verified");
    let hash_col = column("password_hash");
    let salt_col = column("password_salt");

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = idx + 2;
        let record = result.map_err(|e| format!("Failed to parse CSV row {line}: {e}"))?;

        let field = |col: usize| record.get(col).unwrap_or("");

        let uid = field(uid_col);
        if uid.is_empty() {
            return Err(format!("Row {line}: uid is empty"));
        }
        let email = field(email_col);
        if email.is_empty() {
            return Err(format!("Row {line}: email is empty"));
        }

        let password_hash = STANDARD
            .decode(field(hash_col))
            .map_err(|e| format!("Row {line}: password_hash is not valid base64: {e}"))?;
        let password_salt = STANDARD
            .decode(field(salt_col))
            .map_err(|e| format!("Row {line}: password_salt is not valid base64: {e}"))?;

        rows.push(ImportUser {
            uid: uid.to_string(),
            email: email.to_string(),
            // Exact literal match only; "True", "1", "" are all false.
            email_verified: field(verified_col) == "true",
            password_hash,
            password_salt,
        });
    }

    Ok(rows)
}
