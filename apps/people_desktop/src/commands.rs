//! Line commands typed into the console front end.

use std::str::FromStr;

use client_core::ViewEvent;
use shared::{
    domain::{ContextId, PersonField},
    error::ServiceError,
};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  list                      show the rows
  create                    add a new person and open it
  select <row|none>         select a row (1-based) or clear the selection
  edit <field> <value>      commit a value into the open detail
  escape <field>            abandon typing in a detail field
  delete                    delete the selected row
  save                      submit pending changes as one batch
  reset                     discard pending changes
  refresh                   reload the list
  reset-source              restore the sample data on the server
  search [text]             filter by last name, empty clears
  sort                      cycle the last name sort order
  dismiss                   close open error notifications
  state                     print the UI state as JSON
  help                      show this text
  quit                      leave";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("'{0}' is not a row number")]
    InvalidRow(String),
    #[error("row {row} does not exist, the list has {len} rows")]
    RowOutOfRange { row: usize, len: usize },
    #[error("no person is open in the detail")]
    NoDetail,
    #[error(transparent)]
    Field(#[from] ServiceError),
}

/// Commands handled by the console itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    List,
    State,
    Dismiss,
    Help,
    Quit,
    View(ViewCommand),
}

/// Commands that become a [`ViewEvent`] once rows are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Create,
    Select(Option<usize>),
    Edit { field: PersonField, value: String },
    Escape { field: PersonField },
    Delete,
    Save,
    Reset,
    Refresh,
    ResetSource,
    Search(String),
    Sort,
}

impl FromStr for ReplCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let view = |command| Ok(ReplCommand::View(command));
        match head.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(ReplCommand::List),
            "state" => Ok(ReplCommand::State),
            "dismiss" => Ok(ReplCommand::Dismiss),
            "help" | "?" => Ok(ReplCommand::Help),
            "quit" | "exit" => Ok(ReplCommand::Quit),
            "create" => view(ViewCommand::Create),
            "select" => view(ViewCommand::Select(parse_row(rest)?)),
            "edit" => {
                let (field, value) = match rest.split_once(char::is_whitespace) {
                    Some((field, value)) => (field, value.trim()),
                    None if !rest.is_empty() => (rest, ""),
                    None => {
                        return Err(CommandError::MissingArgument {
                            command: "edit",
                            argument: "a field",
                        })
                    }
                };
                view(ViewCommand::Edit {
                    field: field.parse()?,
                    value: value.to_string(),
                })
            }
            "escape" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "escape",
                        argument: "a field",
                    });
                }
                view(ViewCommand::Escape {
                    field: rest.parse()?,
                })
            }
            "delete" => view(ViewCommand::Delete),
            "save" => view(ViewCommand::Save),
            "reset" => view(ViewCommand::Reset),
            "refresh" => view(ViewCommand::Refresh),
            "reset-source" => view(ViewCommand::ResetSource),
            "search" => view(ViewCommand::Search(rest.to_string())),
            "sort" => view(ViewCommand::Sort),
            _ => Err(CommandError::Unknown(head.to_string())),
        }
    }
}

fn parse_row(raw: &str) -> Result<Option<usize>, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "select",
            argument: "a row number or 'none'",
        });
    }
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match raw.parse::<usize>() {
        Ok(row) if row > 0 => Ok(Some(row)),
        _ => Err(CommandError::InvalidRow(raw.to_string())),
    }
}

impl ViewCommand {
    /// Resolves row numbers against `rows` (display order) and edits against the open detail.
    pub fn into_event(
        self,
        rows: &[ContextId],
        detail: Option<ContextId>,
    ) -> Result<ViewEvent, CommandError> {
        let event = match self {
            ViewCommand::Create => ViewEvent::Create,
            ViewCommand::Select(None) => ViewEvent::SelectionChanged(None),
            ViewCommand::Select(Some(row)) => {
                let id = row
                    .checked_sub(1)
                    .and_then(|index| rows.get(index))
                    .copied()
                    .ok_or(CommandError::RowOutOfRange {
                        row,
                        len: rows.len(),
                    })?;
                ViewEvent::SelectionChanged(Some(id))
            }
            ViewCommand::Edit { field, value } => ViewEvent::FieldEdited {
                context: detail.ok_or(CommandError::NoDetail)?,
                field,
                value,
                committed: true,
            },
            ViewCommand::Escape { field } => ViewEvent::FieldEdited {
                context: detail.ok_or(CommandError::NoDetail)?,
                field,
                value: String::new(),
                committed: false,
            },
            ViewCommand::Delete => ViewEvent::Delete,
            ViewCommand::Save => ViewEvent::Save,
            ViewCommand::Reset => ViewEvent::ResetChanges,
            ViewCommand::Refresh => ViewEvent::Refresh,
            ViewCommand::ResetSource => ViewEvent::ResetDataSource,
            ViewCommand::Search(query) => ViewEvent::Search(query),
            ViewCommand::Sort => ViewEvent::ToggleSort,
        };
        Ok(event)
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
