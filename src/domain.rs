use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Rows shown per volume group before pagination kicks in.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Bucket key for records without a gazette volume number.
pub const UNKNOWN_VOLUME: &str = "Unknown Volume";

pub const HELP_TEXT: &str = "\
 gmv key bindings

  q             quit
  /             search (filters live; Enter keeps, Esc restores)
  Esc           clear search / close popup
  Tab / S-Tab   next / previous volume group
  Enter         expand / collapse selected group
  E / C         expand / collapse all groups
  Up / Down     move row cursor
  Left / Right  move column cursor
  s             sort by current column (again to flip direction)
  n / p         next / previous page in selected group
  Home / End    first / last page in selected group
  e             export filtered rows as CSV
  c             copy selected row to clipboard
  ?             this help
";

#[derive(Debug)]
pub enum GmvError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    UnknownSortKey(String),
}

impl From<Error> for GmvError {
    fn from(err: Error) -> Self {
        GmvError::IoError(err)
    }
}

impl From<PolarsError> for GmvError {
    fn from(err: PolarsError) -> Self {
        GmvError::PolarsError(err)
    }
}

impl From<serde_json::Error> for GmvError {
    fn from(err: serde_json::Error) -> Self {
        GmvError::JsonError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct GmvConfig {
    pub page_size: usize,
    pub max_column_width: usize,
    pub event_poll_time: u64,
}

impl Default for GmvConfig {
    fn default() -> Self {
        GmvConfig {
            page_size: DEFAULT_PAGE_SIZE,
            max_column_width: 40,
            event_poll_time: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    NextGroup,
    PrevGroup,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    ToggleGroup,
    ExpandAll,
    CollapseAll,
    ToggleSort,
    Search,
    ExportCsv,
    CopyRow,
    CopyCell,
    Help,
    Exit,
    RawKey(KeyEvent),
}
