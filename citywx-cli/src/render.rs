use citywx_core::{DisplayState, Renderer};

/// Prints the display to stdout. When a frame only adds lines to the
/// previous one (an icon arriving), just the new lines are printed.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Vec<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, state: &DisplayState) {
        let lines = frame_lines(state);

        if !self.last.is_empty() && lines.starts_with(&self.last) {
            for line in &lines[self.last.len()..] {
                println!("{line}");
            }
        } else {
            println!();
            for line in &lines {
                println!("{line}");
            }
        }

        self.last = lines;
    }
}

pub(crate) fn frame_lines(state: &DisplayState) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(error) = &state.error {
        lines.push(format!("error: {error}"));
        return lines;
    }

    let fields = [&state.temperature, &state.humidity, &state.description];
    lines.extend(fields.into_iter().flatten().filter(|s| !s.is_empty()).cloned());

    if let Some(at) = state.updated_at {
        lines.push(format!("as of {}", at.format("%H:%M:%S")));
    }

    if let Some(icon) = &state.icon {
        lines.push(format!("Icon: {} ({}x{})", icon.url, icon.width(), icon.height()));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_frame_hides_weather_fields() {
        let state = DisplayState {
            temperature: Some("75 °F".into()),
            error: Some("Please enter a city.".into()),
            ..DisplayState::default()
        };

        assert_eq!(frame_lines(&state), vec!["error: Please enter a city.".to_string()]);
    }

    #[test]
    fn weather_frame_lists_fields_in_order() {
        let state = DisplayState {
            temperature: Some("75 °F".into()),
            humidity: Some("Humidity: 40%".into()),
            description: Some("Light Rain".into()),
            ..DisplayState::default()
        };

        assert_eq!(frame_lines(&state), vec!["75 °F", "Humidity: 40%", "Light Rain"]);
    }

    #[test]
    fn blank_description_is_skipped() {
        let state = DisplayState {
            temperature: Some("50 °F".into()),
            description: Some(String::new()),
            ..DisplayState::default()
        };

        assert_eq!(frame_lines(&state), vec!["50 °F"]);
    }
}
