use super::validate::truncate_to_boundary;

pub const MAX_PLAYER_NAME_LENGTH: usize = 31;
pub const MAX_SCORE_NAME_LENGTH: usize = 8;

pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>();
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    truncate_to_boundary(&cleaned, MAX_PLAYER_NAME_LENGTH).to_string()
}

/// Name as stored in the score file: a single whitespace-free token of at
/// most eight bytes.
pub fn score_name(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let token = truncate_to_boundary(&joined, MAX_SCORE_NAME_LENGTH);
    if token.is_empty() {
        return "anon".to_string();
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_whitespace_and_caps_length() {
        assert_eq!(sanitize_player_name("  Big   Snake ", "x"), "Big Snake");
        assert_eq!(sanitize_player_name("   ", "Player1"), "Player1");
        let long = "a".repeat(64);
        assert_eq!(sanitize_player_name(&long, "x").len(), MAX_PLAYER_NAME_LENGTH);
    }

    #[test]
    fn score_names_are_single_short_tokens() {
        assert_eq!(score_name("Player One"), "Player_O");
        assert_eq!(score_name("ann"), "ann");
        assert_eq!(score_name(" "), "anon");
    }
}
