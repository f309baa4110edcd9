use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::TableState;
use site_client::{CacheEvent, ConfirmRequest, EntityKey, MutationError, Notice, QueryKey};
use site_core::board::{partition, Board};
use site_core::comments::{thread_comments, CommentThread};
use site_core::{
    group_tasks, BoardColumn, CategoryResolver, ChecklistItem, ChecklistItemComment, CommentDraft,
    EntityId, MoveRequest, Task, TaskFilter, TaskStatus,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

pub const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;

/// Work for the async side of the dashboard. Every variant maps to one
/// session call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadTasks { project_id: Option<EntityId> },
    LoadCategories(Vec<EntityId>),
    LoadChecklist(EntityId),
    LoadComments(EntityId),
    Refresh { project_id: Option<EntityId> },
    ToggleTask(Task),
    DeleteTask(EntityId),
    BulkDelete(Vec<EntityId>),
    MoveItem { task_id: EntityId, request: MoveRequest },
    ToggleItem(ChecklistItem),
    DeleteItem { task_id: EntityId, item_id: EntityId },
    AddComment(CommentDraft),
    DeleteComment { item_id: EntityId, comment_id: EntityId },
}

impl Command {
    /// Entities this command mutates; empty for reads.
    pub fn keys(&self) -> Vec<EntityKey> {
        match self {
            Command::ToggleTask(task) => vec![EntityKey::Task(task.id)],
            Command::DeleteTask(id) => vec![EntityKey::Task(*id)],
            Command::BulkDelete(ids) => ids.iter().map(|id| EntityKey::Task(*id)).collect(),
            Command::MoveItem { request, .. } => vec![EntityKey::ChecklistItem(request.item_id)],
            Command::ToggleItem(item) => vec![EntityKey::ChecklistItem(item.id)],
            Command::DeleteItem { item_id, .. } => vec![EntityKey::ChecklistItem(*item_id)],
            Command::AddComment(draft) => vec![EntityKey::NewComment(draft.checklist_item_id)],
            Command::DeleteComment { comment_id, .. } => vec![EntityKey::Comment(*comment_id)],
            Command::LoadTasks { .. }
            | Command::LoadCategories(_)
            | Command::LoadChecklist(_)
            | Command::LoadComments(_)
            | Command::Refresh { .. } => Vec::new(),
        }
    }
}

/// Results coming back from the worker tasks.
#[derive(Debug)]
pub enum Update {
    Tasks(Result<Vec<Task>, String>),
    Resolver(CategoryResolver),
    Checklist {
        task_id: EntityId,
        result: Result<Vec<ChecklistItem>, String>,
    },
    Comments {
        item_id: EntityId,
        result: Result<Vec<ChecklistItemComment>, String>,
    },
    Finished {
        keys: Vec<EntityKey>,
        outcome: Result<(), MutationError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRow {
    Tier1 { name: String, total: usize, percent: u8 },
    Tier2 { name: String, total: usize, percent: u8 },
    Task { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    #[default]
    Tasks,
    Board,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
    Comment,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub expires_at: Instant,
}

pub struct App {
    pub project_id: Option<EntityId>,
    pub author: String,
    pub tasks: Vec<Task>,
    pub filter: TaskFilter,
    pub rows: Vec<DisplayRow>,
    pub table_state: TableState,
    pub resolver: CategoryResolver,
    pub checklist_task: Option<EntityId>,
    pub checklist: Vec<ChecklistItem>,
    pub column: BoardColumn,
    pub column_rows: [usize; 4],
    pub follow_item: Option<EntityId>,
    pub comments_item: Option<EntityId>,
    pub comments: Vec<ChecklistItemComment>,
    pub thread_index: usize,
    pub reply_to: Option<EntityId>,
    pub show_comments: bool,
    pub show_help: bool,
    pub focus: FocusMode,
    pub input: InputMode,
    pub input_buffer: String,
    pub marked: BTreeSet<EntityId>,
    pub pending: HashSet<EntityKey>,
    pub prompt: Option<ConfirmRequest>,
    pub toasts: VecDeque<Toast>,
    pub status_note: Option<String>,
    pub last_error: Option<String>,
    pub loading: bool,
    pub now: DateTime<Utc>,
    should_quit: bool,
}

impl App {
    pub fn new(project_id: Option<EntityId>, author: String) -> Self {
        Self {
            project_id,
            author,
            tasks: Vec::new(),
            filter: TaskFilter {
                project_id,
                ..TaskFilter::default()
            },
            rows: Vec::new(),
            table_state: TableState::default(),
            resolver: CategoryResolver::new(),
            checklist_task: None,
            checklist: Vec::new(),
            column: BoardColumn::ToDo,
            column_rows: [0; 4],
            follow_item: None,
            comments_item: None,
            comments: Vec::new(),
            thread_index: 0,
            reply_to: None,
            show_comments: false,
            show_help: false,
            focus: FocusMode::Tasks,
            input: InputMode::Normal,
            input_buffer: String::new(),
            marked: BTreeSet::new(),
            pending: HashSet::new(),
            prompt: None,
            toasts: VecDeque::new(),
            status_note: None,
            last_error: None,
            loading: true,
            now: Utc::now(),
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn initial_commands(&self) -> Vec<Command> {
        vec![Command::LoadTasks {
            project_id: self.project_id,
        }]
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.now = Utc::now();
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    pub fn push_notice(&mut self, notice: Notice, now: Instant) {
        self.toasts.push_back(Toast {
            notice,
            expires_at: now + TOAST_TTL,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    pub fn set_prompt(&mut self, request: ConfirmRequest) {
        if let Some(previous) = self.prompt.replace(request) {
            let _ = previous.reply.send(false);
        }
    }

    pub fn is_pending(&self, key: EntityKey) -> bool {
        self.pending.contains(&key)
    }

    // Task pane

    pub fn recalc_rows(&mut self) {
        let selected_id = self.selected_task().map(|task| task.id);
        let index_by_id: HashMap<EntityId, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id, idx))
            .collect();

        let visible = self.filter.apply_owned(&self.tasks);
        let groups = group_tasks(&visible);
        let mut rows = Vec::new();
        for tier1 in groups.iter() {
            rows.push(DisplayRow::Tier1 {
                name: tier1.name.clone(),
                total: tier1.len(),
                percent: tier1.completion_percent(),
            });
            for tier2 in &tier1.subgroups {
                rows.push(DisplayRow::Tier2 {
                    name: tier2.name.clone(),
                    total: tier2.len(),
                    percent: tier2.completion_percent(),
                });
                rows.extend(
                    tier2
                        .items
                        .iter()
                        .filter_map(|task| index_by_id.get(&task.id))
                        .map(|&index| DisplayRow::Task { index }),
                );
            }
        }
        self.rows = rows;

        let restored = selected_id.and_then(|id| {
            self.rows.iter().position(
                |row| matches!(row, DisplayRow::Task { index } if self.tasks[*index].id == id),
            )
        });
        let first_task = self
            .rows
            .iter()
            .position(|row| matches!(row, DisplayRow::Task { .. }));
        self.table_state.select(restored.or(first_task));
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let selected = self.table_state.selected()?;
        match self.rows.get(selected)? {
            DisplayRow::Task { index } => self.tasks.get(*index),
            _ => None,
        }
    }

    fn move_task_selection(&mut self, delta: isize) -> Option<Command> {
        let task_rows: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches!(row, DisplayRow::Task { .. }))
            .map(|(idx, _)| idx)
            .collect();
        if task_rows.is_empty() {
            return None;
        }
        let current = self
            .table_state
            .selected()
            .and_then(|selected| task_rows.iter().position(|row| *row == selected))
            .unwrap_or(0) as isize;
        let len = task_rows.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.table_state.select(Some(task_rows[next]));
        self.open_selected_checklist()
    }

    fn open_selected_checklist(&mut self) -> Option<Command> {
        let task_id = self.selected_task()?.id;
        if self.checklist_task == Some(task_id) {
            return None;
        }
        self.checklist_task = Some(task_id);
        self.checklist.clear();
        self.column = BoardColumn::ToDo;
        self.column_rows = [0; 4];
        self.close_comments();
        Some(Command::LoadChecklist(task_id))
    }

    fn cycle_status_filter(&mut self) {
        self.filter.status = match self.filter.status {
            None => Some(TaskStatus::NotStarted),
            Some(TaskStatus::NotStarted) => Some(TaskStatus::InProgress),
            Some(TaskStatus::InProgress) => Some(TaskStatus::Completed),
            Some(TaskStatus::Completed) => Some(TaskStatus::OnHold),
            Some(TaskStatus::OnHold) => None,
        };
        self.recalc_rows();
    }

    pub fn filter_label(&self) -> &'static str {
        self.filter.status.map_or("all", |status| status.as_str())
    }

    fn toggle_mark(&mut self) {
        let Some(id) = self.selected_task().map(|task| task.id) else {
            return;
        };
        if !self.marked.remove(&id) {
            self.marked.insert(id);
        }
    }

    // Board pane

    pub fn board(&self) -> Board<'_> {
        partition(&self.checklist)
    }

    pub fn selected_item(&self) -> Option<&ChecklistItem> {
        let board = self.board();
        let row = self.column_rows[self.column.index()];
        board.column(self.column).get(row).copied()
    }

    fn move_item_cursor(&mut self, delta: isize) {
        let len = self.board().column(self.column).len();
        if len == 0 {
            return;
        }
        let slot = &mut self.column_rows[self.column.index()];
        *slot = ((*slot as isize + delta).rem_euclid(len as isize)) as usize;
    }

    fn switch_column(&mut self, forward: bool) {
        let next = if forward {
            self.column.next()
        } else {
            self.column.prev()
        };
        if let Some(column) = next {
            self.column = column;
        }
    }

    fn clamp_board_cursor(&mut self) {
        let board = partition(&self.checklist);
        for column in BoardColumn::ALL {
            let len = board.column(column).len();
            let slot = &mut self.column_rows[column.index()];
            *slot = (*slot).min(len.saturating_sub(1));
        }
    }

    /// Keyboard drag: carries the selected item one column over.
    fn move_selected_item(&mut self, forward: bool) -> Option<Command> {
        let item = self.selected_item()?;
        let (item_id, task_id) = (item.id, item.task_id);
        let source = self.column;
        let destination = if forward { source.next() } else { source.prev() };
        if let Some(destination) = destination {
            self.column = destination;
            self.follow_item = Some(item_id);
        }
        Some(Command::MoveItem {
            task_id,
            request: MoveRequest {
                item_id,
                source,
                destination,
            },
        })
    }

    // Comment pane

    pub fn threads(&self) -> Vec<CommentThread<'_>> {
        thread_comments(&self.comments)
    }

    fn open_comments(&mut self) -> Option<Command> {
        let item_id = self.selected_item()?.id;
        self.show_comments = true;
        self.focus = FocusMode::Comments;
        if self.comments_item == Some(item_id) {
            return None;
        }
        self.comments_item = Some(item_id);
        self.comments.clear();
        self.thread_index = 0;
        Some(Command::LoadComments(item_id))
    }

    fn close_comments(&mut self) {
        self.show_comments = false;
        self.comments_item = None;
        self.comments.clear();
        self.thread_index = 0;
        self.reply_to = None;
        if self.focus == FocusMode::Comments {
            self.focus = FocusMode::Board;
        }
    }

    fn selected_thread_root(&self) -> Option<EntityId> {
        self.threads()
            .get(self.thread_index)
            .map(|thread| thread.root.id)
    }

    fn begin_comment(&mut self, reply: bool) {
        if self.comments_item.is_none() {
            return;
        }
        self.reply_to = if reply {
            self.selected_thread_root()
        } else {
            None
        };
        self.input = InputMode::Comment;
        self.input_buffer.clear();
    }

    // Input

    /// Gates a mutation on the UI-side pending set, the same way a disabled
    /// button would.
    fn guarded(&mut self, command: Option<Command>) -> Option<Command> {
        let command = command?;
        let keys = command.keys();
        if let Some(busy) = keys.iter().find(|key| self.pending.contains(key)) {
            self.status_note = Some(format!("{busy} is still saving"));
            return None;
        }
        self.pending.extend(keys);
        Some(command)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return None;
        }
        match self.input {
            InputMode::Search => return self.handle_search_key(key),
            InputMode::Comment => return self.handle_comment_key(key),
            InputMode::Normal => {}
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                None
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else if self.show_comments {
                    self.close_comments();
                } else {
                    self.focus = FocusMode::Tasks;
                }
                None
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    FocusMode::Tasks => FocusMode::Board,
                    FocusMode::Board if self.show_comments => FocusMode::Comments,
                    FocusMode::Board | FocusMode::Comments => FocusMode::Tasks,
                };
                None
            }
            KeyCode::Char('r') => {
                self.loading = true;
                Some(Command::Refresh {
                    project_id: self.project_id,
                })
            }
            KeyCode::Char('/') => {
                self.input = InputMode::Search;
                self.input_buffer = self.filter.search.clone().unwrap_or_default();
                None
            }
            KeyCode::Char('f') => {
                self.cycle_status_filter();
                None
            }
            _ => match self.focus {
                FocusMode::Tasks => self.handle_task_key(key),
                FocusMode::Board => self.handle_board_key(key),
                FocusMode::Comments => self.handle_comments_key(key),
            },
        }
    }

    fn handle_task_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_task_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_task_selection(-1),
            KeyCode::Enter => {
                self.focus = FocusMode::Board;
                self.open_selected_checklist()
            }
            KeyCode::Char(' ') => {
                self.toggle_mark();
                None
            }
            KeyCode::Char('x') => {
                let command = self.selected_task().cloned().map(Command::ToggleTask);
                self.guarded(command)
            }
            KeyCode::Char('d') => {
                let command = self.selected_task().map(|task| Command::DeleteTask(task.id));
                self.guarded(command)
            }
            KeyCode::Char('D') => {
                if self.marked.is_empty() {
                    self.status_note = Some("mark tasks with space first".to_string());
                    return None;
                }
                let ids: Vec<EntityId> = self.marked.iter().copied().collect();
                self.guarded(Some(Command::BulkDelete(ids)))
            }
            _ => None,
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_item_cursor(1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_item_cursor(-1);
                None
            }
            KeyCode::Left => {
                self.switch_column(false);
                None
            }
            KeyCode::Right => {
                self.switch_column(true);
                None
            }
            KeyCode::Char('h') => {
                let command = self.move_selected_item(false);
                self.guarded(command)
            }
            KeyCode::Char('l') => {
                let command = self.move_selected_item(true);
                self.guarded(command)
            }
            KeyCode::Char('x') => {
                let command = self.selected_item().cloned().map(Command::ToggleItem);
                self.guarded(command)
            }
            KeyCode::Char('d') => {
                let command = self.selected_item().map(|item| Command::DeleteItem {
                    task_id: item.task_id,
                    item_id: item.id,
                });
                self.guarded(command)
            }
            KeyCode::Char('c') | KeyCode::Enter => self.open_comments(),
            _ => None,
        }
    }

    fn handle_comments_key(&mut self, key: KeyEvent) -> Option<Command> {
        let threads = self.threads().len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') if threads > 0 => {
                self.thread_index = (self.thread_index + 1) % threads;
                None
            }
            KeyCode::Up | KeyCode::Char('k') if threads > 0 => {
                self.thread_index = (self.thread_index + threads - 1) % threads;
                None
            }
            KeyCode::Char('a') => {
                self.begin_comment(false);
                None
            }
            KeyCode::Enter => {
                self.begin_comment(true);
                None
            }
            KeyCode::Char('d') => {
                let item_id = self.comments_item?;
                let comment_id = self.selected_thread_root()?;
                self.guarded(Some(Command::DeleteComment {
                    item_id,
                    comment_id,
                }))
            }
            _ => None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Enter => {
                self.input = InputMode::Normal;
                let query = std::mem::take(&mut self.input_buffer);
                self.filter.search = Some(query.trim().to_string()).filter(|q| !q.is_empty());
                self.recalc_rows();
                return self.open_selected_checklist();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(ch) => self.input_buffer.push(ch),
            _ => {}
        }
        None
    }

    fn handle_comment_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.input_buffer.clear();
                self.reply_to = None;
                None
            }
            KeyCode::Enter => {
                let item_id = self.comments_item?;
                self.input = InputMode::Normal;
                let draft = CommentDraft {
                    checklist_item_id: item_id,
                    parent_id: self.reply_to.take(),
                    author_name: self.author.clone(),
                    content: std::mem::take(&mut self.input_buffer).trim().to_string(),
                };
                self.guarded(Some(Command::AddComment(draft)))
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
                None
            }
            KeyCode::Char(ch) => {
                self.input_buffer.push(ch);
                None
            }
            _ => None,
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let answer = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        if let Some(request) = self.prompt.take() {
            let _ = request.reply.send(answer);
        }
    }

    // Updates

    pub fn apply_update(&mut self, update: Update) -> Vec<Command> {
        match update {
            Update::Tasks(Ok(tasks)) => {
                self.loading = false;
                self.last_error = None;
                let known: HashSet<EntityId> = tasks.iter().map(|task| task.id).collect();
                self.marked.retain(|id| known.contains(id));
                let mut projects: Vec<EntityId> = tasks.iter().map(|task| task.project_id).collect();
                projects.sort();
                projects.dedup();
                self.tasks = tasks;
                self.recalc_rows();
                let mut commands = vec![Command::LoadCategories(projects)];
                if self.checklist_task.is_some_and(|id| !known.contains(&id)) {
                    self.checklist_task = None;
                    self.checklist.clear();
                    self.close_comments();
                }
                commands.extend(self.open_selected_checklist());
                commands
            }
            Update::Tasks(Err(err)) => {
                self.loading = false;
                self.last_error = Some(format!("Failed to load tasks: {err}"));
                Vec::new()
            }
            Update::Resolver(resolver) => {
                self.resolver = resolver;
                Vec::new()
            }
            Update::Checklist { task_id, result } => {
                if self.checklist_task != Some(task_id) {
                    return Vec::new();
                }
                match result {
                    Ok(items) => {
                        self.checklist = items;
                        self.follow_moved_item();
                        self.clamp_board_cursor();
                    }
                    Err(err) => self.status_note = Some(format!("Failed to load checklist: {err}")),
                }
                Vec::new()
            }
            Update::Comments { item_id, result } => {
                if self.comments_item != Some(item_id) {
                    return Vec::new();
                }
                match result {
                    Ok(comments) => {
                        self.comments = comments;
                        let threads = self.threads().len();
                        self.thread_index = self.thread_index.min(threads.saturating_sub(1));
                    }
                    Err(err) => self.status_note = Some(format!("Failed to load comments: {err}")),
                }
                Vec::new()
            }
            Update::Finished { keys, outcome } => {
                if !matches!(outcome, Err(MutationError::Busy { .. })) {
                    for key in &keys {
                        self.pending.remove(key);
                    }
                }
                if outcome.is_ok() {
                    for key in &keys {
                        if let EntityKey::Task(id) = key {
                            self.marked.remove(id);
                        }
                    }
                }
                if let Err(MutationError::Cancelled) = outcome {
                    self.status_note = Some("cancelled".to_string());
                }
                Vec::new()
            }
        }
    }

    fn follow_moved_item(&mut self) {
        let Some(item_id) = self.follow_item else {
            return;
        };
        let located = self.board().locate(item_id);
        if let Some((column, row)) = located {
            self.column = column;
            self.column_rows[column.index()] = row;
        }
        self.follow_item = None;
    }

    /// Which query to re-read when the shared cache reports a change.
    pub fn command_for_cache_event(&self, event: &CacheEvent) -> Option<Command> {
        let (key, written) = match event {
            CacheEvent::Updated(key) => (key, true),
            CacheEvent::Invalidated(key) => (key, false),
        };
        match *key {
            QueryKey::Tasks { project_id } if !written && project_id == self.project_id => {
                Some(Command::LoadTasks { project_id })
            }
            QueryKey::Checklist(task_id) if self.checklist_task == Some(task_id) => {
                Some(Command::LoadChecklist(task_id))
            }
            QueryKey::Comments(item_id) if !written && self.comments_item == Some(item_id) => {
                Some(Command::LoadComments(item_id))
            }
            _ => None,
        }
    }

    pub fn build_title(&self) -> String {
        let visible = self.filter.apply(&self.tasks);
        let total = visible.len();
        let done = visible.iter().filter(|task| task.is_completed()).count();
        let percent = site_core::grouping::completion_percent(done, total);
        let scope = self
            .project_id
            .map_or_else(|| "all projects".to_string(), |id| format!("project {id}"));
        let mut title = format!(
            "[{scope}] {} {done}/{total} | Filter: {}",
            site_core::format::progress_bar(percent, 10),
            self.filter_label()
        );
        if let Some(search) = &self.filter.search {
            title.push_str(&format!(" | Search: {search}"));
        }
        if !self.pending.is_empty() {
            title.push_str(&format!(" | Saving {}", self.pending.len()));
        }
        title
    }
}
