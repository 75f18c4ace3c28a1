/*!
Byte order marks in declaration files and offline data files
*/

use exchange_docs::core::read_text_file;
use exchange_docs::offline_data::load_offline_data;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_declaration_file_with_bom() -> std::io::Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    let mut content = vec![0xEF, 0xBB, 0xBF];
    content.extend_from_slice(
        b"export declare class SpotClient {\n    /** Exchange info */\n    getExchangeInfo(): Promise<object>;\n}\n",
    );
    temp_file.write_all(&content)?;

    let text = read_text_file(temp_file.path()).unwrap();
    assert!(text.starts_with("export declare class"));

    let path = temp_file.path().with_extension("d.ts");
    std::fs::copy(temp_file.path(), &path)?;
    let methods = exchange_docs::extract_declarations(&path).unwrap();
    std::fs::remove_file(&path)?;

    assert_eq!(methods["getExchangeInfo"].method_comment, "Exchange info");
    Ok(())
}

#[test]
fn test_offline_data_with_bom() -> std::io::Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all("\u{FEFF}{\"methods\": {\"getTicker\": {\"doc\": \"GET /spot/ticker\"}}, \"readme\": \"\"}".as_bytes())?;

    let data = load_offline_data(temp_file.path()).unwrap();
    assert_eq!(data.methods["getTicker"].doc, "GET /spot/ticker");
    Ok(())
}
