use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use site_client::Session;
use site_core::format::{format_currency, format_hours};
use site_core::grouping::{Categorized, Costed};
use site_core::taxonomy::CategorySource;
use site_core::{
    group_by_category, CategoryColor, CategoryResolver, EntityId, Labor, ResolvedCategory,
};
use std::fmt::Write as _;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum CategoryCommand {
    Resolve(ResolveArgs),
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum CostCommand {
    Summary(CostSummaryArgs),
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct CostSummaryArgs {
    #[arg(long, conflicts_with = "materials")]
    pub labor: bool,
    #[arg(long)]
    pub materials: bool,
}

pub async fn handle_category_command(
    session: &Session,
    project: Option<EntityId>,
    command: CategoryCommand,
) -> Result<()> {
    match command {
        CategoryCommand::Resolve(args) => {
            let resolver = match project {
                Some(id) => session.category_resolver(&[id]).await,
                None => CategoryResolver::new(),
            };
            println!("{}", describe(&resolver.resolve(&args.name, project)));
            Ok(())
        }
    }
}

pub fn describe(resolved: &ResolvedCategory) -> String {
    let color = match &resolved.color {
        CategoryColor::Theme(slot) => format!("theme:{}", slot_name(*slot)),
        CategoryColor::Hex(hex) => hex.clone(),
    };
    let source = match resolved.source {
        CategorySource::Project => "project",
        CategorySource::Known => "built-in",
        CategorySource::Fallback => "fallback",
    };
    format!("{}\t{color}\t{source}", resolved.display_name)
}

fn slot_name(slot: site_core::ThemeSlot) -> &'static str {
    match slot {
        site_core::ThemeSlot::Primary => "primary",
        site_core::ThemeSlot::Secondary => "secondary",
        site_core::ThemeSlot::Accent => "accent",
        site_core::ThemeSlot::Muted => "muted",
    }
}

pub async fn handle_cost_command(
    session: &Session,
    project: Option<EntityId>,
    command: CostCommand,
) -> Result<()> {
    match command {
        CostCommand::Summary(args) => {
            let both = !args.labor && !args.materials;
            let mut project_ids: Vec<EntityId> = project.into_iter().collect();
            if project_ids.is_empty() {
                project_ids = session
                    .projects()
                    .await
                    .context("Failed to load projects")?
                    .into_iter()
                    .map(|project| project.id)
                    .collect();
            }
            let resolver = session.category_resolver(&project_ids).await;

            if both || args.labor {
                let labor = session
                    .labor(project)
                    .await
                    .context("Failed to load labor")?;
                print!("{}", labor_summary(&labor, &resolver, project));
            }
            if both || args.materials {
                let materials = session
                    .materials(project)
                    .await
                    .context("Failed to load materials")?;
                print!(
                    "{}",
                    cost_summary("Materials", &materials, &resolver, project)
                );
            }
            Ok(())
        }
    }
}

/// Tier1/tier2 cost roll-up for any categorized, costed record.
pub fn cost_summary<T: Categorized + Costed>(
    title: &str,
    records: &[T],
    resolver: &CategoryResolver,
    project: Option<EntityId>,
) -> String {
    let groups = group_by_category(records);
    let total: f64 = groups.iter().map(|group| group.total_cost()).sum();
    let mut out = String::new();
    let _ = writeln!(out, "{title}: {}", format_currency(total));
    for tier1 in groups.iter() {
        let name = resolver.resolve(&tier1.name, project).display_name;
        let _ = writeln!(
            out,
            "  {name}: {} ({} entries)",
            format_currency(tier1.total_cost()),
            tier1.len()
        );
        for tier2 in &tier1.subgroups {
            let name = resolver.resolve(&tier2.name, project).display_name;
            let _ = writeln!(out, "    {name}: {}", format_currency(tier2.total_cost()));
        }
    }
    out
}

pub fn labor_summary(
    labor: &[Labor],
    resolver: &CategoryResolver,
    project: Option<EntityId>,
) -> String {
    let hours: f64 = labor.iter().map(|entry| entry.total_hours).sum();
    let mut out = cost_summary("Labor", labor, resolver, project);
    let _ = writeln!(out, "  Hours: {}", format_hours(hours));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_core::ProjectCategory;

    fn labor(id: u64, tier1: Option<&str>, hours: f64, rate: f64) -> Labor {
        Labor {
            id: EntityId::new(id),
            project_id: Some(EntityId::new(1)),
            task_id: None,
            contact_id: None,
            full_name: "Sam".to_string(),
            tier1_category: tier1.map(str::to_string),
            tier2_category: None,
            work_date: None,
            total_hours: hours,
            hourly_rate: Some(rate),
            labor_cost: None,
            task_description: None,
        }
    }

    #[test]
    fn resolve_reports_project_records_first() {
        let resolver = CategoryResolver::new().with_project_categories(
            EntityId::new(1),
            vec![ProjectCategory {
                id: EntityId::new(10),
                project_id: EntityId::new(1),
                name: "Site Prep".to_string(),
                tier: Some("tier1".to_string()),
                parent_id: None,
                color: Some("#aa5500".to_string()),
                description: None,
            }],
        );
        assert_eq!(
            describe(&resolver.resolve("site prep", Some(EntityId::new(1)))),
            "Site Prep\t#aa5500\tproject"
        );
        assert_eq!(
            describe(&resolver.resolve("structural", None)),
            "Structural\ttheme:primary\tbuilt-in"
        );
        assert!(describe(&resolver.resolve("", None)).starts_with("Uncategorized\t#"));
    }

    #[test]
    fn labor_rolls_up_cost_and_hours() {
        let entries = vec![
            labor(1, Some("structural"), 8.0, 50.0),
            labor(2, Some("structural"), 2.5, 40.0),
            labor(3, None, 1.0, 30.0),
        ];
        let out = labor_summary(&entries, &CategoryResolver::new(), None);
        assert_eq!(
            out,
            "Labor: $530.00\n  Structural: $500.00 (2 entries)\n    Other: $500.00\n\
             \x20 Uncategorized: $30.00 (1 entries)\n    Other: $30.00\n  Hours: 11.5h\n"
        );
    }
}
