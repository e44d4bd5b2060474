//! Deterministic import scripts for matched library assets.

use crate::domain::{quote_literal, GeneratedScript, ScriptOrigin, ENTRY_POINT};

use super::error::AssetError;
use super::format::AssetFormat;
use super::matcher::AssetRecord;

/// Emit a script that imports `record` and links the result into the
/// current collection.
///
/// `.blend` files go through library linking; every other format has its own
/// host import routine selected by extension. Only the lowercase alphanumeric
/// words of `query` reach the script, and only inside a comment.
pub fn build_import_script(record: &AssetRecord, query: &str) -> Result<GeneratedScript, AssetError> {
    let format = record.asset_format()?;
    let path = quote_literal(&record.path.to_string_lossy());
    let filename = quote_literal(&record.filename);

    let import_call = match format {
        AssetFormat::Blend => "context.link_library(path)".to_string(),
        other => format!("context.import_asset({}, path)", quote_literal(other.extension())),
    };

    let source = format!(
        r#"// Import {stem} ({format}) for: {request}
fn {ENTRY_POINT}(context) {{
    let path = {path};
    let imported = {import_call};
    let target = context.collection();
    for name in imported {{
        context.link_to_collection(name, target);
    }}
    context.log("Imported " + imported.len() + " object(s) from " + {filename});
}}
"#,
        stem = comment_safe(record.stem()),
        request = comment_safe(query),
    );
    Ok(GeneratedScript::new(source, ScriptOrigin::AssetImport))
}

fn comment_safe(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
