use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use site_client::{MoveOutcome, MutationError, Session};
use site_core::board::partition;
use site_core::comments::thread_comments;
use site_core::format::format_date;
use site_core::{
    BoardColumn, ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch,
    CommentDraft, EntityId, MoveRequest,
};
use std::fmt::Write as _;

use crate::task::parse_date;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum ChecklistCommand {
    Board(BoardArgs),
    Add(ItemAddArgs),
    Move(ItemMoveArgs),
    Done(ItemTargetArgs),
    Reopen(ItemTargetArgs),
    #[command(alias = "remove")]
    Rm(ItemTargetArgs),
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum CommentCommand {
    List(CommentListArgs),
    Add(CommentAddArgs),
    #[command(alias = "remove")]
    Rm(CommentRemoveArgs),
}

#[derive(Args, Debug)]
pub struct BoardArgs {
    pub task: EntityId,
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    pub task: EntityId,
    pub title: String,
    #[arg(long, default_value = "To Do")]
    pub section: BoardColumn,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct ItemMoveArgs {
    pub item: EntityId,
    #[arg(long)]
    pub task: EntityId,
    #[arg(long)]
    pub to: BoardColumn,
}

#[derive(Args, Debug)]
pub struct ItemTargetArgs {
    pub item: EntityId,
    #[arg(long)]
    pub task: EntityId,
}

#[derive(Args, Debug)]
pub struct CommentListArgs {
    pub item: EntityId,
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    pub item: EntityId,
    pub content: String,
    #[arg(long)]
    pub reply_to: Option<EntityId>,
    #[arg(long, default_value = "Site team")]
    pub author: String,
}

#[derive(Args, Debug)]
pub struct CommentRemoveArgs {
    pub item: EntityId,
    pub comment: EntityId,
}

pub async fn handle_checklist_command(session: &Session, command: ChecklistCommand) -> Result<()> {
    match command {
        ChecklistCommand::Board(args) => show_board(session, args.task).await,
        ChecklistCommand::Add(args) => add_item(session, args).await,
        ChecklistCommand::Move(args) => move_item(session, &args).await,
        ChecklistCommand::Done(args) => set_completed(session, &args, true).await,
        ChecklistCommand::Reopen(args) => set_completed(session, &args, false).await,
        ChecklistCommand::Rm(args) => {
            cancelled_is_ok(session.delete_checklist_item(args.task, args.item).await)
        }
    }
}

pub async fn handle_comment_command(session: &Session, command: CommentCommand) -> Result<()> {
    match command {
        CommentCommand::List(args) => {
            let comments = session
                .comments(args.item)
                .await
                .context("Failed to load comments")?;
            print!("{}", render_threads(&comments));
            Ok(())
        }
        CommentCommand::Add(args) => {
            let draft = CommentDraft {
                checklist_item_id: args.item,
                parent_id: args.reply_to,
                author_name: args.author,
                content: args.content,
            };
            let comment = session.add_comment(&draft).await?;
            println!("{}", comment.id);
            Ok(())
        }
        CommentCommand::Rm(args) => {
            cancelled_is_ok(session.delete_comment(args.item, args.comment).await)
        }
    }
}

fn cancelled_is_ok(result: Result<(), MutationError>) -> Result<()> {
    match result {
        Ok(()) | Err(MutationError::Cancelled) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

async fn load_items(session: &Session, task: EntityId) -> Result<Vec<ChecklistItem>> {
    session
        .checklist(task)
        .await
        .with_context(|| format!("Failed to load checklist for task {task}"))
}

async fn find_item(session: &Session, task: EntityId, item: EntityId) -> Result<ChecklistItem> {
    load_items(session, task)
        .await?
        .into_iter()
        .find(|candidate| candidate.id == item)
        .ok_or_else(|| anyhow!("Checklist item {item} not found on task {task}"))
}

async fn show_board(session: &Session, task: EntityId) -> Result<()> {
    let items = load_items(session, task).await?;
    print!("{}", render_board(&items));
    Ok(())
}

pub fn render_board(items: &[ChecklistItem]) -> String {
    let board = partition(items);
    let summary = board.summary();
    let mut out = String::new();
    for (column, column_items) in board.iter() {
        let counts = summary.column(column);
        let _ = writeln!(out, "{column} ({}/{})", counts.completed, counts.total);
        for item in column_items {
            let check = if item.completed { "x" } else { " " };
            let _ = write!(out, "  [{check}] {} {}", item.id, item.title);
            if let Some(due) = item.due_date {
                let _ = write!(out, " (due {})", format_date(due));
            }
            out.push('\n');
        }
    }
    let _ = writeln!(
        out,
        "{}/{} done ({}%)",
        summary.completed(),
        summary.total(),
        summary.completion_percent()
    );
    out
}

async fn add_item(session: &Session, args: ItemAddArgs) -> Result<()> {
    let mut draft = ChecklistItemDraft::new(args.task, args.title);
    draft.section = args.section;
    draft.assigned_to = args.assignee;
    draft.due_date = args.due;
    let item = session.create_checklist_item(&draft).await?;
    println!("{}", item.id);
    Ok(())
}

async fn move_item(session: &Session, args: &ItemMoveArgs) -> Result<()> {
    let item = find_item(session, args.task, args.item).await?;
    let request = MoveRequest {
        item_id: item.id,
        source: BoardColumn::for_section(item.section.as_deref()),
        destination: Some(args.to),
    };
    match session.move_checklist_item(args.task, request).await? {
        MoveOutcome::Unchanged => println!("{} is already in {}", item.id, args.to),
        MoveOutcome::Moved(saved) => println!(
            "{} -> {}",
            saved.id,
            BoardColumn::for_section(saved.section.as_deref())
        ),
    }
    Ok(())
}

async fn set_completed(session: &Session, args: &ItemTargetArgs, completed: bool) -> Result<()> {
    let saved = session
        .update_checklist_item(
            args.task,
            args.item,
            &ChecklistItemPatch::completed(completed),
        )
        .await?;
    let check = if saved.completed { "x" } else { " " };
    println!("[{check}] {} {}", saved.id, saved.title);
    Ok(())
}

pub fn render_threads(comments: &[ChecklistItemComment]) -> String {
    let threads = thread_comments(comments);
    if threads.is_empty() {
        return "No comments\n".to_string();
    }
    let mut out = String::new();
    for thread in threads {
        let root = thread.root;
        let _ = writeln!(
            out,
            "{} [{}] {}: {}",
            format_date(root.created_at),
            root.id,
            root.author_name,
            root.content
        );
        for reply in thread.replies {
            let _ = writeln!(
                out,
                "    └ [{}] {}: {}",
                reply.id, reply.author_name, reply.content
            );
        }
    }
    out
}
