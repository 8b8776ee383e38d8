use crate::controller::editor::{Direction, EmbedDirection, Editor, LineDirection, SelectionMode};
use crate::document_model::{Block, SemicodeError, blocks_from_text};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` needs an argument")]
    MissingArgument { command: String },
    #[error("invalid argument `{argument}` for `{command}`")]
    InvalidArgument { command: String, argument: String },
    #[error(transparent)]
    Semicode(#[from] SemicodeError),
    #[error("line {line}: {source}")]
    Script { line: usize, source: Box<CommandError> },
}

type CommandResult = Result<(), CommandError>;

/// Executes line-oriented edit commands against an [`Editor`].
#[derive(Debug, Default)]
pub struct CommandController {
    history: Vec<String>,
}

impl CommandController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands executed so far, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Runs every line of `script`. Blank lines and `#` comments are skipped;
    /// the first failing line stops the script.
    pub fn execute_script(&mut self, script: &str, editor: &mut Editor) -> CommandResult {
        for (index, line) in script.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.execute_command(trimmed, editor).map_err(|source| CommandError::Script {
                line: index + 1,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    pub fn execute_command(&mut self, command_str: &str, editor: &mut Editor) -> CommandResult {
        let trimmed = command_str.trim_start();
        let (name, argument) = match trimmed.split_once(' ') {
            Some((name, rest)) => (name, Some(rest)),
            None => (trimmed.trim_end(), None),
        };
        debug!(command = name, "execute");

        // Each group answers None when the command is not one of its own
        let result = self
            .execute_insert_command(name, argument, editor)
            .or_else(|| self.execute_motion_command(name, argument, editor))
            .or_else(|| self.execute_selection_command(name, argument, editor))
            .or_else(|| self.execute_structure_command(name, argument, editor))
            .unwrap_or_else(|| Err(CommandError::UnknownCommand(name.to_string())));

        if result.is_ok() {
            self.history.push(trimmed.trim_end().to_string());
        }
        result
    }

    fn execute_insert_command(&self, name: &str, argument: Option<&str>, editor: &mut Editor) -> Option<CommandResult> {
        let blocks = match name {
            "insert" => match required(name, argument.filter(|text| !text.is_empty())) {
                Ok(text) => blocks_from_text(text),
                Err(err) => return Some(Err(err)),
            },
            "newline" => vec![Block::Char('\n')],
            "tab" => vec![Block::Char('\t')],
            "link" => vec![Block::LinkMarker],
            "label" => vec![Block::LabelMarker],
            "node" => {
                editor.insert_new_node();
                return Some(Ok(()));
            }
            "paste" => {
                return Some(
                    required(name, argument)
                        .and_then(|text| editor.paste_semicode(text).map_err(CommandError::from)),
                );
            }
            _ => return None,
        };
        editor.insert_at_caret(blocks);
        Some(Ok(()))
    }

    fn execute_motion_command(&self, name: &str, argument: Option<&str>, editor: &mut Editor) -> Option<CommandResult> {
        let clear = SelectionMode::ClearSelection;
        let result = match name {
            "move" => parse_number::<isize>(name, argument).map(|position| editor.move_caret(position, clear, None)),
            "left" => {
                editor.move_caret_by(-1, clear);
                Ok(())
            }
            "right" => {
                editor.move_caret_by(1, clear);
                Ok(())
            }
            "home" => {
                editor.move_caret_line_start(clear);
                Ok(())
            }
            "end" => {
                editor.move_caret_line_end(clear);
                Ok(())
            }
            "top" => {
                editor.move_caret(0, clear, None);
                Ok(())
            }
            "bottom" => {
                editor.move_caret(isize::MAX, clear, None);
                Ok(())
            }
            "word" => parse_direction(name, argument).map(|direction| editor.move_caret_word(direction, clear)),
            "line" => parse_line_direction(name, argument).map(|direction| editor.move_caret_line(direction, clear)),
            "embed" => {
                let direction = match required(name, argument) {
                    Ok("forward") => Ok(EmbedDirection::Forwards),
                    Ok("backward") => Ok(EmbedDirection::Backwards),
                    Ok("up") => Ok(EmbedDirection::Up),
                    Ok(other) => Err(invalid(name, other)),
                    Err(err) => Err(err),
                };
                direction.map(|direction| editor.move_caret_across_embed(direction))
            }
            _ => return None,
        };
        Some(result)
    }

    fn execute_selection_command(&self, name: &str, argument: Option<&str>, editor: &mut Editor) -> Option<CommandResult> {
        let keep = SelectionMode::KeepSelection;
        let result = match name {
            "select-all" => {
                editor.select_all();
                Ok(())
            }
            "deselect" => {
                editor.deselect();
                Ok(())
            }
            "select-word" => {
                parse_number::<usize>(name, argument).map(|position| editor.select_word_at_position(position, None))
            }
            "extend" => match required(name, argument) {
                Ok("left") => {
                    editor.move_caret_by(-1, keep);
                    Ok(())
                }
                Ok("right") => {
                    editor.move_caret_by(1, keep);
                    Ok(())
                }
                Ok("up") => {
                    editor.move_caret_line(LineDirection::Up, keep);
                    Ok(())
                }
                Ok("down") => {
                    editor.move_caret_line(LineDirection::Down, keep);
                    Ok(())
                }
                Ok(other) => Err(invalid(name, other)),
                Err(err) => Err(err),
            },
            _ => return None,
        };
        Some(result)
    }

    fn execute_structure_command(&self, name: &str, argument: Option<&str>, editor: &mut Editor) -> Option<CommandResult> {
        let result = match name {
            "delete" => parse_direction(name, argument).map(|direction| {
                editor.delete_at_caret(direction);
            }),
            "nest" => {
                editor.nest_selection();
                Ok(())
            }
            "unnest" => {
                editor.unnest();
                Ok(())
            }
            "unnest-at" => parse_number::<usize>(name, argument).map(|index| {
                editor.unnest_block(index);
            }),
            "duplicate" => parse_line_direction(name, argument).map(|direction| editor.duplicate_lines(direction)),
            "delete-line" => {
                editor.delete_line_at_caret();
                Ok(())
            }
            "move-lines" => parse_line_direction(name, argument).map(|direction| editor.move_lines(direction)),
            _ => return None,
        };
        Some(result)
    }
}

fn required<'a>(command: &str, argument: Option<&'a str>) -> Result<&'a str, CommandError> {
    argument.ok_or_else(|| CommandError::MissingArgument { command: command.to_string() })
}

fn invalid(command: &str, argument: &str) -> CommandError {
    CommandError::InvalidArgument {
        command: command.to_string(),
        argument: argument.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(command: &str, argument: Option<&str>) -> Result<T, CommandError> {
    let argument = required(command, argument)?.trim();
    argument.parse().map_err(|_| invalid(command, argument))
}

fn parse_direction(command: &str, argument: Option<&str>) -> Result<Direction, CommandError> {
    match required(command, argument)?.trim() {
        "forward" => Ok(Direction::Forwards),
        "backward" => Ok(Direction::Backwards),
        other => Err(invalid(command, other)),
    }
}

fn parse_line_direction(command: &str, argument: Option<&str>) -> Result<LineDirection, CommandError> {
    match required(command, argument)?.trim() {
        "up" => Ok(LineDirection::Up),
        "down" => Ok(LineDirection::Down),
        other => Err(invalid(command, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::{Sequence, encode};

    fn run(script: &str) -> Editor {
        let mut editor = Editor::new();
        CommandController::new().execute_script(script, &mut editor).unwrap();
        editor
    }

    #[test]
    fn test_insert_keeps_inner_spaces() {
        let editor = run("insert hello  world\nnewline\ninsert x");
        assert_eq!(editor.document().text(), "hello  world\nx");
    }

    #[test]
    fn test_script_skips_comments_and_blank_lines() {
        let mut editor = Editor::new();
        let mut controller = CommandController::new();
        controller
            .execute_script("# header\n\ninsert abc\n   # indented\nleft\n", &mut editor)
            .unwrap();
        assert_eq!(controller.history(), ["insert abc".to_string(), "left".to_string()]);
        assert_eq!(editor.caret_position(), 2);
    }

    #[test]
    fn test_link_and_label_markers() {
        let editor = run("insert a\nlink\ninsert b\nlabel");
        assert_eq!(
            editor.document().to_vec(),
            vec![Block::Char('a'), Block::LinkMarker, Block::Char('b'), Block::LabelMarker]
        );
    }

    #[test]
    fn test_motion_and_selection() {
        let editor = run("insert one two\nhome\nword forward\nextend right\nextend right");
        assert_eq!(editor.selection(), (4, 6));

        let editor = run("insert ab\nnewline\ninsert cd\nline up\nend");
        assert_eq!(editor.caret_position(), 2);
    }

    #[test]
    fn test_structure_commands() {
        let editor = run("insert abcd\nselect-all\nnest\nembed backward\nembed up");
        assert_eq!(editor.document().len(), 1);
        assert_eq!(editor.context_path().len(), 1);

        let editor = run("insert abcd\nselect-all\nnest\nunnest-at 0");
        assert_eq!(editor.document().text(), "abcd");
    }

    #[test]
    fn test_line_commands() {
        let editor = run("insert ab\nnewline\ninsert cd\ntop\nmove-lines down");
        assert_eq!(editor.document().text(), "cd\nab\n");

        let editor = run("insert ab\nduplicate down\ndelete-line");
        assert_eq!(editor.document().text(), "ab\n");
    }

    #[test]
    fn test_paste_semicode() {
        let editor = run("paste a\u{EEEF}1:b");
        let doc = editor.document().to_vec();
        assert_eq!(doc.len(), 2);
        assert!(doc[1].structurally_eq(&Block::Sequence(Sequence::from_text("b"))));
        assert_eq!(encode(editor.document(), editor.registry()).unwrap(), "a\u{EEEF}1:b");
    }

    #[test]
    fn test_errors() {
        let mut editor = Editor::new();
        let mut controller = CommandController::new();
        assert!(matches!(
            controller.execute_command("frobnicate", &mut editor),
            Err(CommandError::UnknownCommand(name)) if name == "frobnicate"
        ));
        assert!(matches!(
            controller.execute_command("move", &mut editor),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            controller.execute_command("word sideways", &mut editor),
            Err(CommandError::InvalidArgument { argument, .. }) if argument == "sideways"
        ));
        assert!(matches!(
            controller.execute_command("paste \u{EEEF}x:", &mut editor),
            Err(CommandError::Semicode(SemicodeError::MalformedEmbedLength { .. }))
        ));
        assert!(controller.history().is_empty());
    }

    #[test]
    fn test_script_error_reports_line() {
        let mut editor = Editor::new();
        let err = CommandController::new()
            .execute_script("insert a\n\nbogus", &mut editor)
            .unwrap_err();
        assert!(matches!(err, CommandError::Script { line: 3, .. }));
        assert_eq!(err.to_string(), "line 3: unknown command `bogus`");
        assert_eq!(editor.document().text(), "a");
    }
}
