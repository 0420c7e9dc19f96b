//! Upload filename sanitisation

const MAX_NAME_LEN: usize = 100;

const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client-supplied filename to a safe, flat name.
///
/// The result only contains `[A-Za-z0-9._-]`, never starts with a dot, is at
/// most 100 characters (extension kept) and is never empty.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let mut name = cleaned.trim_start_matches(['.', '_']).to_string();
    if name.is_empty() {
        return "file".to_string();
    }

    let stem = name.split('.').next().unwrap_or_default();
    if RESERVED_STEMS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        name.insert(0, '_');
    }

    truncate_keeping_extension(name)
}

fn truncate_keeping_extension(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < MAX_NAME_LEN => {
            let extension = &name[dot..];
            let stem = &name[..MAX_NAME_LEN - extension.len()];
            format!("{}{}", stem, extension)
        }
        _ => name[..MAX_NAME_LEN].to_string(),
    }
}
