//! Upload validation, MIME detection, and filename sanitizing.
//!
//! Uploaded artifacts are checked before a job is created:
//! 1. Non-empty and under the size limit
//! 2. Extension blocklist
//! 3. Magic bytes of executables

use crate::{Error, Result};

/// Magic byte signatures for executable files.
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat / Java Class", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

/// Blocked file extensions (compared lowercase).
const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "scr", "pif", "com", "msi", "so", "dylib", "jar", "class", "deb", "rpm",
    "apk", "app", "dmg", "pkg", "bat", "cmd", "lnk", "hta",
];

/// Validate an uploaded artifact before accepting it as a job.
///
/// Returns [`Error::InvalidInput`] with a client-presentable reason.
pub fn validate_upload(filename: &str, data: &[u8], max_size_bytes: usize) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidInput("Uploaded file is empty".into()));
    }

    if data.len() > max_size_bytes {
        return Err(Error::InvalidInput(format!(
            "File exceeds maximum size of {} bytes",
            max_size_bytes
        )));
    }

    if let Some(ext) = extension(filename) {
        if BLOCKED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::InvalidInput(format!(
                "File extension .{} is not allowed",
                ext
            )));
        }
    }

    for (name, magic) in MAGIC_SIGNATURES {
        if data.starts_with(magic) {
            return Err(Error::InvalidInput(format!(
                "Executable file detected: {}",
                name
            )));
        }
    }

    Ok(())
}

/// Resolve the MIME type of an audio upload.
///
/// Magic bytes win, then a known audio extension, then the client's claim.
/// Anything still unknown becomes `application/octet-stream`.
pub fn detect_audio_type(filename: &str, data: &[u8], claimed: Option<&str>) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some(mime) = extension(filename).and_then(|ext| mime_from_audio_extension(&ext)) {
        return mime.to_string();
    }

    match claimed {
        Some(c) if !c.trim().is_empty() => c.trim().to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// File extension to use when forwarding audio with the given MIME type.
pub fn audio_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/aac" => "aac",
        "audio/webm" | "video/webm" => "webm",
        "audio/m4a" | "audio/x-m4a" | "audio/mp4" => "m4a",
        _ => "wav",
    }
}

fn mime_from_audio_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "mp3" => Some("audio/mpeg"),
        "wav" | "wave" => Some("audio/wav"),
        "ogg" | "oga" | "opus" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "aac" => Some("audio/aac"),
        "m4a" => Some("audio/m4a"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}

fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Sanitize filename for safe storage.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_');
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    // Truncate on a char boundary, keeping the extension
    const MAX_LEN: usize = 200;
    if sanitized.len() > MAX_LEN {
        let ext = sanitized
            .rfind('.')
            .map(|pos| &sanitized[pos..])
            .filter(|ext| ext.len() < 16)
            .unwrap_or("");
        let mut end = MAX_LEN - ext.len();
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        return format!("{}{}", &sanitized[..end], ext);
    }

    sanitized.to_string()
}
