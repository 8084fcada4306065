use resume_core::{Breakpoint, LOAD_FAILED_HINT, LOAD_FAILED_TITLE};

/// Snapshot of what the toolbars display.
#[derive(Debug, Clone)]
pub struct ToolbarState<'a> {
    pub current_page: usize,
    pub page_count: usize,
    pub zoom_percent: u32,
    /// Digits typed into the page field, shown instead of the current page.
    pub page_input: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub breakpoint: Breakpoint,
}

/// Top bar: print, download and the external link.
pub fn top_bar(breakpoint: Breakpoint) -> String {
    if breakpoint.is_mobile() {
        "[P] [D] | [W] Site ↗".to_string()
    } else {
        "[P]rint  [D]ownload | [W] My Website ↗".to_string()
    }
}

/// Bottom bar: page navigation and zoom.
pub fn bottom_bar(state: &ToolbarState<'_>) -> String {
    let page_field = match state.page_input {
        Some(input) => format!("[{input}_]"),
        None => state.current_page.to_string(),
    };
    let prev = if state.current_page <= 1 { "·" } else { "▲" };
    let next = if state.current_page >= state.page_count {
        "·"
    } else {
        "▼"
    };

    let mut bar = if state.breakpoint.is_mobile() {
        format!("{prev} {page_field}/{} {next}", state.page_count)
    } else {
        format!("{prev} Page {page_field} / {} {next}", state.page_count)
    };
    bar.push_str(&format!(" | − {}% +", state.zoom_percent));

    if let Some(notice) = state.notice.filter(|n| !n.is_empty()) {
        bar.push_str(" | ");
        bar.push_str(notice);
    }
    bar
}

pub const LOADING_MESSAGE: &str = "Loading";

pub fn failure_lines() -> [&'static str; 2] {
    [LOAD_FAILED_TITLE, LOAD_FAILED_HINT]
}

/// Pads or truncates `text` to exactly `width` characters, centred.
pub fn centered(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(breakpoint: Breakpoint) -> ToolbarState<'static> {
        ToolbarState {
            current_page: 3,
            page_count: 10,
            zoom_percent: 125,
            page_input: None,
            notice: None,
            breakpoint,
        }
    }

    #[test]
    fn desktop_bottom_bar() {
        insta::assert_snapshot!(bottom_bar(&state(Breakpoint::Desktop)), @"▲ Page 3 / 10 ▼ | − 125% +");
    }

    #[test]
    fn mobile_bottom_bar_drops_label() {
        insta::assert_snapshot!(bottom_bar(&state(Breakpoint::Mobile)), @"▲ 3/10 ▼ | − 125% +");
    }

    #[test]
    fn bottom_bar_shows_page_input_and_notice() {
        let mut state = state(Breakpoint::Tablet);
        state.page_input = Some("7");
        state.notice = Some("Saved /tmp/resume.pdf");
        insta::assert_snapshot!(bottom_bar(&state), @"▲ Page [7_] / 10 ▼ | − 125% + | Saved /tmp/resume.pdf");
    }

    #[test]
    fn boundary_arrows_are_disabled() {
        let mut state = state(Breakpoint::Desktop);
        state.current_page = 1;
        state.page_count = 1;
        assert_eq!(bottom_bar(&state), "· Page 1 / 1 · | − 125% +");
    }

    #[test]
    fn top_bar_shortens_on_mobile() {
        assert_eq!(top_bar(Breakpoint::Mobile), "[P] [D] | [W] Site ↗");
        assert!(top_bar(Breakpoint::Desktop).contains("My Website"));
    }

    #[test]
    fn centered_pads_both_sides() {
        assert_eq!(centered("ab", 6), "  ab  ");
        assert_eq!(centered("abc", 6), " abc  ");
        assert_eq!(centered("abcdef", 3), "abc");
    }
}
