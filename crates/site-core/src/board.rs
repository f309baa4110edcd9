use crate::grouping::completion_percent;
use crate::ids::EntityId;
use crate::records::ChecklistItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardColumn {
    #[serde(rename = "To Do")]
    ToDo,
    Planning,
    Preparation,
    Execution,
}

impl BoardColumn {
    pub const ALL: [BoardColumn; 4] = [
        BoardColumn::ToDo,
        BoardColumn::Planning,
        BoardColumn::Preparation,
        BoardColumn::Execution,
    ];

    /// The value stored in `ChecklistItem::section` for this column.
    pub fn id(self) -> &'static str {
        match self {
            BoardColumn::ToDo => "To Do",
            BoardColumn::Planning => "Planning",
            BoardColumn::Preparation => "Preparation",
            BoardColumn::Execution => "Execution",
        }
    }

    pub fn index(self) -> usize {
        match self {
            BoardColumn::ToDo => 0,
            BoardColumn::Planning => 1,
            BoardColumn::Preparation => 2,
            BoardColumn::Execution => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display column for a stored section; missing or unknown values show under "To Do".
    pub fn for_section(section: Option<&str>) -> Self {
        section
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(BoardColumn::ToDo)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl fmt::Display for BoardColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BoardColumn {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input
            .trim()
            .to_lowercase()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "todo" => Ok(BoardColumn::ToDo),
            "planning" => Ok(BoardColumn::Planning),
            "preparation" => Ok(BoardColumn::Preparation),
            "execution" => Ok(BoardColumn::Execution),
            _ => Err(format!("Unknown column: {}", input.trim())),
        }
    }
}

/// Checklist items partitioned into the four display columns.
#[derive(Debug, Clone, Default)]
pub struct Board<'a> {
    columns: [Vec<&'a ChecklistItem>; 4],
}

pub fn partition(items: &[ChecklistItem]) -> Board<'_> {
    let mut board = Board::default();
    for item in items {
        let column = BoardColumn::for_section(item.section.as_deref());
        board.columns[column.index()].push(item);
    }
    board
}

impl<'a> Board<'a> {
    pub fn column(&self, column: BoardColumn) -> &[&'a ChecklistItem] {
        &self.columns[column.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoardColumn, &[&'a ChecklistItem])> {
        BoardColumn::ALL
            .into_iter()
            .map(move |column| (column, self.column(column)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn locate(&self, item_id: EntityId) -> Option<(BoardColumn, usize)> {
        self.iter().find_map(|(column, items)| {
            items
                .iter()
                .position(|item| item.id == item_id)
                .map(|row| (column, row))
        })
    }

    pub fn summary(&self) -> BoardSummary {
        let mut columns = [ColumnSummary::default(); 4];
        for (column, items) in self.iter() {
            columns[column.index()] = ColumnSummary {
                total: items.len(),
                completed: items.iter().filter(|item| item.completed).count(),
            };
        }
        BoardSummary { columns }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSummary {
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardSummary {
    pub columns: [ColumnSummary; 4],
}

impl BoardSummary {
    pub fn column(&self, column: BoardColumn) -> ColumnSummary {
        self.columns[column.index()]
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.total).sum()
    }

    pub fn completed(&self) -> usize {
        self.columns.iter().map(|c| c.completed).sum()
    }

    pub fn completion_percent(&self) -> u8 {
        completion_percent(self.completed(), self.total())
    }
}

/// A drop event: the item, where it was picked up and where it landed (if anywhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub item_id: EntityId,
    pub source: BoardColumn,
    pub destination: Option<BoardColumn>,
}

impl MoveRequest {
    /// Builds a request from raw droppable ids. An unknown destination id is
    /// treated as "dropped outside any column".
    pub fn from_drag(item_id: EntityId, source: &str, destination: Option<&str>) -> Option<Self> {
        let source = source.parse().ok()?;
        Some(Self {
            item_id,
            source,
            destination: destination.and_then(|raw| raw.parse().ok()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionChange {
    pub item_id: EntityId,
    pub from: BoardColumn,
    pub to: BoardColumn,
}

/// `None` means the drop is a no-op: no state change and no request.
pub fn plan_move(request: &MoveRequest) -> Option<SectionChange> {
    let destination = request.destination?;
    if destination == request.source {
        return None;
    }
    Some(SectionChange {
        item_id: request.item_id,
        from: request.source,
        to: destination,
    })
}

/// Rewrites only `section` on the matching item. Returns whether it was found.
pub fn apply_section_change(items: &mut [ChecklistItem], change: &SectionChange) -> bool {
    match items.iter_mut().find(|item| item.id == change.item_id) {
        Some(item) => {
            item.section = Some(change.to.id().to_string());
            true
        }
        None => false,
    }
}

/// Undoes `change` for one item, putting back the section it had before.
/// Leaves the item alone when something newer already replaced the
/// optimistic section.
pub fn revert_section_change(
    items: &mut [ChecklistItem],
    change: &SectionChange,
    previous: Option<String>,
) -> bool {
    match items.iter_mut().find(|item| item.id == change.item_id) {
        Some(item) if item.section.as_deref() == Some(change.to.id()) => {
            item.section = previous;
            true
        }
        _ => false,
    }
}
