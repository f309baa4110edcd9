use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use site_client::{MutationError, Session};
use site_core::board::partition;
use site_core::dates::parse_lenient;
use site_core::format::{format_currency, format_date, progress_bar};
use site_core::grouping::completion_percent;
use site_core::{
    group_tasks, CategoryResolver, EntityId, Task, TaskDraft, TaskFilter, TaskStatus,
};
use std::fmt::Write as _;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum TaskCommand {
    List(TaskListArgs),
    Show(TaskTargetArgs),
    #[command(alias = "create")]
    Add(TaskAddArgs),
    Done(TaskTargetArgs),
    Reopen(TaskTargetArgs),
    #[command(alias = "set-status")]
    Status(TaskStatusArgs),
    #[command(alias = "remove")]
    Rm(TaskRemoveArgs),
}

#[derive(Args, Debug)]
pub struct TaskListArgs {
    #[arg(long)]
    pub grouped: bool,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long, alias = "query")]
    pub search: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskTargetArgs {
    pub id: EntityId,
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    pub title: String,
    #[arg(long, value_parser = parse_date)]
    pub start: DateTime<Utc>,
    #[arg(long, value_parser = parse_date)]
    pub end: DateTime<Utc>,
    #[arg(long, alias = "description")]
    pub desc: Option<String>,
    #[arg(long)]
    pub tier1: Option<String>,
    #[arg(long)]
    pub tier2: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub estimate: Option<f64>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
}

#[derive(Args, Debug)]
pub struct TaskStatusArgs {
    pub id: EntityId,
    pub status: TaskStatus,
}

#[derive(Args, Debug)]
pub struct TaskRemoveArgs {
    #[arg(required = true)]
    pub ids: Vec<EntityId>,
}

pub fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    parse_lenient(input).ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got {input:?}"))
}

pub async fn handle_task_command(
    session: &Session,
    project: Option<EntityId>,
    command: TaskCommand,
) -> Result<()> {
    match command {
        TaskCommand::List(args) => list_tasks(session, project, &args).await,
        TaskCommand::Show(args) => show_task(session, args.id).await,
        TaskCommand::Add(args) => add_task(session, project, args).await,
        TaskCommand::Done(args) => set_status(session, args.id, TaskStatus::Completed).await,
        TaskCommand::Reopen(args) => set_status(session, args.id, TaskStatus::NotStarted).await,
        TaskCommand::Status(args) => set_status(session, args.id, args.status).await,
        TaskCommand::Rm(args) => remove_tasks(session, &args.ids).await,
    }
}

async fn list_tasks(
    session: &Session,
    project: Option<EntityId>,
    args: &TaskListArgs,
) -> Result<()> {
    let tasks = session
        .tasks(project)
        .await
        .context("Failed to load tasks")?;
    let filter = TaskFilter {
        project_id: project,
        status: args.status,
        search: args.search.clone(),
    };
    let visible = filter.apply_owned(&tasks);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }
    if visible.is_empty() {
        println!("No tasks found");
        return Ok(());
    }

    let now = Utc::now();
    if args.grouped {
        let mut project_ids: Vec<EntityId> = visible.iter().map(|task| task.project_id).collect();
        project_ids.sort();
        project_ids.dedup();
        let resolver = session.category_resolver(&project_ids).await;
        print!("{}", render_grouped(&visible, &resolver, project, now));
    } else {
        for task in &visible {
            println!("{}", task_line(task, now));
        }
        println!("{} tasks, {}% complete", visible.len(), completion_of(&visible));
    }
    Ok(())
}

/// `- [12] (in_progress) Frame walls  Jan 1, 2024 -> Jan 11, 2024  [=====     ] 50%`
pub fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let progress = task.progress(now);
    format!(
        "- [{}] ({}) {}  {} -> {}  {} {}%",
        task.id,
        task.status,
        task.title,
        format_date(task.start_date),
        format_date(task.end_date),
        progress_bar(progress, 10),
        progress
    )
}

pub fn render_grouped(
    tasks: &[Task],
    resolver: &CategoryResolver,
    project: Option<EntityId>,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    for tier1 in group_tasks(tasks).iter() {
        let name = resolver.resolve(&tier1.name, project).display_name;
        let _ = writeln!(
            out,
            "{name} {} {}% ({}/{})",
            progress_bar(tier1.completion_percent(), 10),
            tier1.completion_percent(),
            tier1.completed_count(),
            tier1.len()
        );
        for tier2 in &tier1.subgroups {
            let name = resolver.resolve(&tier2.name, project).display_name;
            let _ = writeln!(
                out,
                "  {name} {}% ({}/{})",
                tier2.completion_percent(),
                tier2.completed_count(),
                tier2.len()
            );
            for task in &tier2.items {
                let _ = writeln!(out, "    {}", task_line(task, now));
            }
        }
    }
    out
}

async fn show_task(session: &Session, id: EntityId) -> Result<()> {
    let task = session
        .task(id)
        .await
        .context("Failed to load task")?
        .ok_or_else(|| anyhow!("Task {id} not found"))?;
    let items = session
        .checklist(id)
        .await
        .context("Failed to load checklist")?;
    print!("{}", render_task_detail(&task, &partition(&items).summary(), Utc::now()));
    Ok(())
}

pub fn render_task_detail(
    task: &Task,
    checklist: &site_core::board::BoardSummary,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", task.title);
    let _ = writeln!(out, "Id: {}", task.id);
    let _ = writeln!(out, "Project: {}", task.project_id);
    let _ = writeln!(out, "Status: {}", task.status.label());
    let _ = writeln!(
        out,
        "Category: {} / {}",
        task.tier1_category.as_deref().unwrap_or("-"),
        task.tier2_category.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Dates: {} -> {}",
        format_date(task.start_date),
        format_date(task.end_date)
    );
    let _ = writeln!(out, "Progress: {}%", task.progress(now));
    if let Some(assignee) = &task.assigned_to {
        let _ = writeln!(out, "Assigned: {assignee}");
    }
    if let Some(cost) = task.estimated_cost {
        let _ = writeln!(out, "Estimated: {}", format_currency(cost));
    }
    if let Some(cost) = task.actual_cost {
        let _ = writeln!(out, "Actual: {}", format_currency(cost));
    }
    if let Some(description) = task.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            let _ = writeln!(out, "\n{description}");
        }
    }
    let _ = writeln!(
        out,
        "\nChecklist: {}/{} done ({}%)",
        checklist.completed(),
        checklist.total(),
        checklist.completion_percent()
    );
    out
}

async fn add_task(session: &Session, project: Option<EntityId>, args: TaskAddArgs) -> Result<()> {
    let project = project.context("--project (or SITE_PROJECT_ID) is required to add a task")?;
    let mut draft = TaskDraft::new(project, args.title, args.start, args.end);
    draft.description = args.desc;
    draft.tier1_category = args.tier1;
    draft.tier2_category = args.tier2;
    draft.assigned_to = args.assignee;
    draft.estimated_cost = args.estimate;
    if let Some(status) = args.status {
        draft.status = status;
    }
    let task = session.create_task(&draft).await?;
    println!("{}", task.id);
    Ok(())
}

async fn set_status(session: &Session, id: EntityId, status: TaskStatus) -> Result<()> {
    let task = session.set_task_status(id, status).await?;
    println!("{}", task_line(&task, Utc::now()));
    Ok(())
}

async fn remove_tasks(session: &Session, ids: &[EntityId]) -> Result<()> {
    if let [id] = ids {
        return match session.delete_task(*id).await {
            Ok(()) | Err(MutationError::Cancelled) => Ok(()),
            Err(err) => Err(err.into()),
        };
    }
    let outcome = match session.bulk_delete_tasks(ids).await {
        Ok(outcome) => outcome,
        Err(MutationError::Cancelled) => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    for (id, err) in &outcome.failed {
        eprintln!("  {id}: {err}");
    }
    if !outcome.all_succeeded() {
        bail!(outcome.summary("tasks"));
    }
    Ok(())
}

/// Share of tasks completed, for scripts that only want the number.
pub fn completion_of(tasks: &[Task]) -> u8 {
    let done = tasks.iter().filter(|task| task.is_completed()).count();
    completion_percent(done, tasks.len())
}
