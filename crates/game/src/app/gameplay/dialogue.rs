use engine::EntityId;

#[derive(Debug, Clone)]
struct ActiveDialogue {
    speaker: EntityId,
    speaker_name: String,
    lines: Vec<String>,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DialogueAdvance {
    Idle,
    Line(String),
    Finished { speaker: EntityId },
}

/// Shows one dialogue line at a time.
#[derive(Debug, Clone, Default)]
pub(crate) struct DialogueRunner {
    active: Option<ActiveDialogue>,
}

impl DialogueRunner {
    /// Replaces whatever dialogue was showing. Returns false for an empty
    /// line list.
    pub(crate) fn start(&mut self, speaker: EntityId, speaker_name: &str, lines: &[String]) -> bool {
        if lines.is_empty() {
            return false;
        }
        self.active = Some(ActiveDialogue {
            speaker,
            speaker_name: speaker_name.to_string(),
            lines: lines.to_vec(),
            index: 0,
        });
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// `(speaker name, line, line number, line count)` for the line on screen.
    pub(crate) fn current_line(&self) -> Option<(&str, &str, usize, usize)> {
        let active = self.active.as_ref()?;
        let line = active.lines.get(active.index)?;
        Some((
            active.speaker_name.as_str(),
            line.as_str(),
            active.index + 1,
            active.lines.len(),
        ))
    }

    pub(crate) fn advance(&mut self) -> DialogueAdvance {
        let Some(active) = self.active.as_mut() else {
            return DialogueAdvance::Idle;
        };
        active.index += 1;
        if let Some(line) = active.lines.get(active.index) {
            return DialogueAdvance::Line(line.clone());
        }
        let speaker = active.speaker;
        self.active = None;
        DialogueAdvance::Finished { speaker }
    }

    pub(crate) fn reset(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn walks_lines_then_finishes() {
        let mut runner = DialogueRunner::default();
        assert!(runner.start(EntityId(4), "Elder", &lines(&["one", "two"])));
        assert_eq!(runner.current_line(), Some(("Elder", "one", 1, 2)));
        assert_eq!(runner.advance(), DialogueAdvance::Line("two".to_string()));
        assert_eq!(
            runner.advance(),
            DialogueAdvance::Finished {
                speaker: EntityId(4)
            }
        );
        assert!(!runner.is_active());
        assert_eq!(runner.advance(), DialogueAdvance::Idle);
    }

    #[test]
    fn empty_dialogue_does_not_start() {
        let mut runner = DialogueRunner::default();
        assert!(!runner.start(EntityId(1), "Elder", &[]));
        assert!(!runner.is_active());
    }
}
