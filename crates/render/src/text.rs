//! Text preview normalisation

/// Maximum number of characters kept in a page text preview
pub const PREVIEW_MAX_CHARS: usize = 300;

/// Collapse runs of whitespace into single spaces, trim the ends and keep at
/// most `max_chars` characters.
pub fn clip_preview(raw: &str, max_chars: usize) -> String {
    let mut clipped = String::with_capacity(raw.len().min(max_chars * 4));
    let mut taken = 0;

    for word in raw.split_whitespace() {
        if taken >= max_chars {
            break;
        }
        if taken > 0 {
            clipped.push(' ');
            taken += 1;
            if taken >= max_chars {
                break;
            }
        }
        for ch in word.chars() {
            if taken >= max_chars {
                break;
            }
            clipped.push(ch);
            taken += 1;
        }
    }

    // A cut right after a separator leaves a trailing space
    if clipped.ends_with(' ') {
        clipped.pop();
    }
    clipped
}
