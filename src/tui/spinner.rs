const BRAILLE_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn frame(idx: usize) -> char {
    BRAILLE_FRAMES[idx % BRAILLE_FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::SPINNER_FRAME_COUNT;

    #[test]
    fn frame_count_matches_dashboard() {
        assert_eq!(BRAILLE_FRAMES.len(), SPINNER_FRAME_COUNT);
    }

    #[test]
    fn wrap_around() {
        assert_eq!(frame(0), frame(BRAILLE_FRAMES.len()));
    }

    #[test]
    fn large_index_no_panic() {
        let _ = frame(usize::MAX);
    }
}
