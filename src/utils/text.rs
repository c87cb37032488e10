use regex::Regex;
use std::sync::OnceLock;

/// Replaces every character that is not an ASCII letter or digit with `_`
/// (one for one) and lowercases the rest.
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn annotations() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"\[.*?\]").expect("Invalid bracket regex"),
            Regex::new(r"\(.*?\)").expect("Invalid parenthesis regex"),
            Regex::new(r"\*.*?\*").expect("Invalid asterisk regex"),
        ]
    })
}

/// Lyrics with `[tags]`, `(backing vocals)` and `*directions*` removed,
/// each line trimmed and empty lines dropped.
pub fn strip_performance_notes(lyrics: &str) -> String {
    let mut text = lyrics.to_string();
    for re in annotations() {
        text = re.replace_all(&text, "").into_owned();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_is_one_for_one() {
        assert_eq!(slugify("Ocean Eyes"), "ocean_eyes");
        assert_eq!(slugify("Señor! Café?"), "se_or__caf__");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_strip_performance_notes() {
        assert_eq!(
            strip_performance_notes("[Verse]\nHello\n(oohs)\n*clap*\nWorld"),
            "Hello\nWorld"
        );
        assert_eq!(
            strip_performance_notes("[Dutch] [Miranda] Hallo (echo) daar  \n\n  *spoken* zee"),
            "Hallo  daar\nzee"
        );
    }
}
