use url::Url;

use super::{public_endpoint, PlatformResult};

const PALETTE: &[&str] = &[
    "#fd366e", "#7c67fe", "#0ea5e9", "#16a34a", "#f59e0b", "#e11d48", "#14b8a6", "#6366f1",
];

/// URL of the generated initials avatar for `name`. Nothing is uploaded.
pub fn initials_url(base: &Url, name: &str) -> PlatformResult<Url> {
    let mut url = public_endpoint(base, "avatars/initials")?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}

/// Up to two uppercase initials, one per word.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn initials_svg(name: &str) -> String {
    let text = initials(name);
    let text = if text.is_empty() { "?".to_string() } else { text };
    let color = PALETTE[name.bytes().map(usize::from).sum::<usize>() % PALETTE.len()];

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100"><rect width="100" height="100" fill="{}"/><text x="50" y="50" dy=".35em" text-anchor="middle" font-family="system-ui, sans-serif" font-size="40" fill="#ffffff">{}</text></svg>"##,
        color,
        escape_xml(&text)
    )
}

fn escape_xml(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_take_first_letter_of_two_words() {
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("Grace Brewster Hopper"), "GB");
        assert_eq!(initials("  plato "), "P");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn initials_url_encodes_name() {
        let base = Url::parse("http://localhost:3000").unwrap();
        let url = initials_url(&base, "Ada Lovelace").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/avatars/initials?name=Ada+Lovelace"
        );
    }

    #[test]
    fn svg_contains_initials_and_falls_back() {
        let svg = initials_svg("Ada Lovelace");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">AL</text>"));

        assert!(initials_svg("").contains(">?</text>"));
    }
}
