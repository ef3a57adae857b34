use chrono::Utc;

/// Derive a permlink for a new post from its title and the current UTC
/// time. Lowercased, non-alphanumeric runs collapsed to single dashes.
pub fn derive_permlink(title: &str) -> String {
    let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    slugify(&format!("{title} {stamp}"))
}

fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut dash_pending = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if dash_pending && !out.is_empty() {
                out.push('-');
            }
            dash_pending = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            dash_pending = true;
        }
    }
    out
}
