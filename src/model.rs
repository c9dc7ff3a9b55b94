use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use arboard::Clipboard;
use tracing::{debug, trace, warn};

use crate::domain::{GmvConfig, GmvError, Message};
use crate::engine::{self, GroupState, SortSpec, VolumeGroup};
use crate::export;
use crate::inputter::{InputResult, QueryInput};
use crate::record::{Field, MatchRecord};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

/// One volume group as handed to the renderer: header facts plus the row
/// indices of the current page only.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDisplay {
    pub key: String,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
    pub expanded: bool,
    pub rows: Vec<usize>,
}

/// Snapshot the UI draws from. Derived on demand; holds no state of its own.
pub struct ViewData<'a> {
    pub title: String,
    pub records: &'a [MatchRecord],
    pub groups: Vec<GroupDisplay>,
    pub query: String,
    pub sort: Option<SortSpec>,
    pub selected_group: usize,
    pub cursor_row: usize,
    pub cursor_column: usize,
    pub searching: bool,
    pub input: InputResult,
    pub show_help: bool,
    pub status_message: String,
    pub matched: usize,
    pub total: usize,
    pub page_size: usize,
}

pub struct Model {
    config: GmvConfig,
    pub status: Status,
    source_name: String,
    records: Vec<MatchRecord>,
    query: String,
    sort: Option<SortSpec>,
    visible: Vec<usize>,
    groups: Vec<VolumeGroup>,
    group_state: GroupState,
    selected_group: usize,
    cursor_row: usize,
    cursor_column: usize,
    searching: bool,
    input: QueryInput,
    clipboard: Option<Clipboard>,
    show_help: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: GmvConfig, records: Vec<MatchRecord>, source_name: String) -> Self {
        let status = if records.is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
        let mut model = Self {
            config,
            status,
            source_name,
            records,
            query: String::new(),
            sort: None,
            visible: Vec::new(),
            groups: Vec::new(),
            group_state: GroupState::default(),
            selected_group: 0,
            cursor_row: 0,
            cursor_column: 0,
            searching: false,
            input: QueryInput::default(),
            clipboard: Clipboard::new().ok(),
            show_help: false,
            status_message: String::new(),
        };
        model.refresh_view();
        model.set_status_message(format!(
            "Loaded {} records in {} volume groups",
            model.records.len(),
            model.groups.len()
        ));
        model
    }

    /// Raw key events go to the search box instead of the key map.
    pub fn raw_keyevents(&self) -> bool {
        self.searching
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.refresh_view();
    }

    pub fn set_sort(&mut self, spec: SortSpec) {
        self.sort = Some(spec);
        self.refresh_view();
    }

    /// Write the currently filtered set (all pages) to `path`.
    pub fn export_to(&self, path: &Path) -> Result<usize, GmvError> {
        export::export_csv(&self.records, &self.visible, path)?;
        Ok(self.visible.len())
    }

    pub fn update(&mut self, message: Message) -> Result<(), GmvError> {
        trace!("Update: searching {}, message {:?}", self.searching, message);
        if self.searching {
            if let Message::RawKey(key) = message {
                self.handle_query_key(key);
            }
            return Ok(());
        }
        if self.show_help {
            if matches!(message, Message::Exit | Message::Help | Message::Quit) {
                self.show_help = false;
                if message == Message::Quit {
                    self.quit();
                }
            }
            return Ok(());
        }

        match message {
            Message::Quit => self.quit(),
            Message::Exit => self.clear_query(),
            Message::Search => self.enter_search(),
            Message::NextGroup => self.move_group(1),
            Message::PrevGroup => self.move_group(-1),
            Message::MoveUp => self.move_row(-1),
            Message::MoveDown => self.move_row(1),
            Message::MoveLeft => self.move_column(-1),
            Message::MoveRight => self.move_column(1),
            Message::NextPage => self.change_page(PageChange::Next),
            Message::PrevPage => self.change_page(PageChange::Prev),
            Message::FirstPage => self.change_page(PageChange::First),
            Message::LastPage => self.change_page(PageChange::Last),
            Message::ToggleGroup => self.toggle_group(),
            Message::ExpandAll => self.set_all_groups(true),
            Message::CollapseAll => self.set_all_groups(false),
            Message::ToggleSort => self.toggle_sort(),
            Message::ExportCsv => self.export_default(),
            Message::CopyRow => self.copy_row(),
            Message::CopyCell => self.copy_cell(),
            Message::Help => self.show_help = true,
            Message::RawKey(_) => {}
        }
        Ok(())
    }

    pub fn view(&self) -> ViewData<'_> {
        let groups = self
            .groups
            .iter()
            .map(|g| {
                let page = self.group_state.page(&g.key);
                let rows =
                    engine::paginate(&g.rows, page, self.config.page_size).to_vec();
                GroupDisplay {
                    key: g.key.clone(),
                    total: g.rows.len(),
                    page,
                    pages: engine::display_page_count(g.rows.len(), self.config.page_size),
                    expanded: self.group_state.is_expanded(&g.key),
                    rows,
                }
            })
            .collect();
        ViewData {
            title: self.source_name.clone(),
            records: &self.records,
            groups,
            query: self.query.clone(),
            sort: self.sort,
            selected_group: self.selected_group,
            cursor_row: self.cursor_row,
            cursor_column: self.cursor_column,
            searching: self.searching,
            input: self.input.get(),
            show_help: self.show_help,
            status_message: self.status_message.clone(),
            matched: self.visible.len(),
            total: self.records.len(),
            page_size: engine::normalize_page_size(self.config.page_size),
        }
    }

    // ------------------- derivation -------------------- //

    /// Recompute the visible mask and groups. Runs on every change to the
    /// records, the query or the sort; the source records are never
    /// mutated. Page and expand state survive recomputation, a page that
    /// ended up past its group's new extent simply renders empty.
    fn refresh_view(&mut self) {
        let mask = engine::filter(&self.records, &self.query);
        self.visible = match self.sort {
            Some(spec) => engine::sort(&self.records, &mask, spec),
            None => mask,
        };
        self.groups = engine::group(&self.records, &self.visible);
        self.selected_group = self
            .selected_group
            .min(self.groups.len().saturating_sub(1));
        self.clamp_cursor_row();
        debug!(
            "View: {}/{} records in {} groups",
            self.visible.len(),
            self.records.len(),
            self.groups.len()
        );
    }

    fn current_page_len(&self) -> usize {
        match self.groups.get(self.selected_group) {
            Some(g) => {
                let page = self.group_state.page(&g.key);
                engine::paginate(&g.rows, page, self.config.page_size).len()
            }
            None => 0,
        }
    }

    fn selected_record(&self) -> Option<&MatchRecord> {
        let g = self.groups.get(self.selected_group)?;
        let page = self.group_state.page(&g.key);
        let rows = engine::paginate(&g.rows, page, self.config.page_size);
        rows.get(self.cursor_row).map(|&ridx| &self.records[ridx])
    }

    fn clamp_cursor_row(&mut self) {
        self.cursor_row = self
            .cursor_row
            .min(self.current_page_len().saturating_sub(1));
    }

    // ------------------- search -------------------- //

    fn enter_search(&mut self) {
        self.searching = true;
        self.input.begin(&self.query);
    }

    fn clear_query(&mut self) {
        if !self.query.is_empty() {
            self.query.clear();
            self.refresh_view();
            self.set_status_message("Cleared search".to_string());
        }
    }

    fn handle_query_key(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        let result = self.input.read(key);
        if result.text != self.query {
            self.query = result.text.clone();
            self.refresh_view();
            self.set_status_message(format!(
                "{} of {} records match",
                self.visible.len(),
                self.records.len()
            ));
        }
        if result.finished {
            self.searching = false;
            if result.canceled {
                self.set_status_message("Search canceled".to_string());
            }
        }
    }

    // ------------------- navigation -------------------- //

    fn move_group(&mut self, step: i64) {
        if self.groups.is_empty() {
            return;
        }
        let last = self.groups.len() - 1;
        self.selected_group = if step >= 0 {
            if self.selected_group >= last {
                0
            } else {
                self.selected_group + 1
            }
        } else if self.selected_group == 0 {
            last
        } else {
            self.selected_group - 1
        };
        self.cursor_row = 0;
    }

    fn move_row(&mut self, step: i64) {
        let len = self.current_page_len();
        if len == 0 {
            return;
        }
        self.cursor_row = if step >= 0 {
            (self.cursor_row + 1).min(len - 1)
        } else {
            self.cursor_row.saturating_sub(1)
        };
    }

    fn move_column(&mut self, step: i64) {
        let last = Field::ALL.len() - 1;
        self.cursor_column = if step >= 0 {
            (self.cursor_column + 1).min(last)
        } else {
            self.cursor_column.saturating_sub(1)
        };
    }

    // ------------------- paging -------------------- //

    fn change_page(&mut self, change: PageChange) {
        let Some(g) = self.groups.get(self.selected_group) else {
            return;
        };
        let key = g.key.clone();
        let pages = engine::display_page_count(g.rows.len(), self.config.page_size);
        let current = self.group_state.page(&key);
        let target = match change {
            PageChange::Next => (current + 1).min(pages),
            PageChange::Prev => current.saturating_sub(1).max(1),
            PageChange::First => 1,
            PageChange::Last => pages,
        };
        if target != current {
            self.group_state.set_page(&key, target);
            self.cursor_row = 0;
            self.set_status_message(format!("{key}: page {target}/{pages}"));
        }
    }

    fn toggle_group(&mut self) {
        let Some(g) = self.groups.get(self.selected_group) else {
            return;
        };
        let key = g.key.clone();
        self.group_state.toggle(&key);
        self.cursor_row = 0;
    }

    fn set_all_groups(&mut self, expanded: bool) {
        self.group_state.set_all_expanded(&self.groups, expanded);
        self.cursor_row = 0;
    }

    // ------------------- sorting -------------------- //

    fn toggle_sort(&mut self) {
        let key = Field::ALL[self.cursor_column.min(Field::ALL.len() - 1)];
        let spec = SortSpec::toggle(self.sort, key);
        self.sort = Some(spec);
        self.refresh_view();
        self.set_status_message(format!("Sorted by {} ({:?})", key.label(), spec.dir));
    }

    // ------------------- export & clipboard -------------------- //

    fn export_default(&mut self) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let filename = format!("matches_{millis}.csv");
        match self.export_to(Path::new(&filename)) {
            Ok(count) => {
                self.set_status_message(format!("Exported {count} rows to {filename}"))
            }
            Err(e) => {
                warn!("CSV export failed: {:?}", e);
                self.set_status_message("Export failed, see log".to_string());
            }
        }
    }

    fn copy_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let line = export::csv_row(record);
        self.copy_text(line);
    }

    fn copy_cell(&mut self) {
        let field = Field::ALL[self.cursor_column.min(Field::ALL.len() - 1)];
        let Some(record) = self.selected_record() else {
            return;
        };
        let cell = record.field(field).to_string();
        self.copy_text(cell);
    }

    fn copy_text(&mut self, text: String) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(text) {
                Ok(_) => self.set_status_message("Copied to clipboard".to_string()),
                Err(e) => {
                    trace!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Clipboard error".to_string());
                }
            },
            None => self.set_status_message("Clipboard unavailable".to_string()),
        }
    }

    fn set_status_message(&mut self, message: String) {
        self.status_message = message;
    }
}

#[derive(Debug, Clone, Copy)]
enum PageChange {
    Next,
    Prev,
    First,
    Last,
}
