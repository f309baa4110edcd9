use crate::records::{Contact, Labor, Material};
use crate::Task;
use std::collections::HashMap;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const OTHER: &str = "Other";

/// Records carrying the two-level free-text category tags.
pub trait Categorized {
    fn tier1_category(&self) -> Option<&str>;
    fn tier2_category(&self) -> Option<&str>;
}

pub trait Completable {
    fn is_completed(&self) -> bool;
}

pub trait Costed {
    fn cost(&self) -> f64;
}

impl Categorized for Task {
    fn tier1_category(&self) -> Option<&str> {
        self.tier1_category.as_deref()
    }

    fn tier2_category(&self) -> Option<&str> {
        self.tier2_category.as_deref()
    }
}

impl Completable for Task {
    fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

impl Costed for Task {
    fn cost(&self) -> f64 {
        self.actual_cost.or(self.estimated_cost).unwrap_or(0.0)
    }
}

impl Categorized for Labor {
    fn tier1_category(&self) -> Option<&str> {
        self.tier1_category.as_deref()
    }

    fn tier2_category(&self) -> Option<&str> {
        self.tier2_category.as_deref()
    }
}

impl Costed for Labor {
    fn cost(&self) -> f64 {
        Labor::cost(self)
    }
}

impl Categorized for Material {
    fn tier1_category(&self) -> Option<&str> {
        self.tier1_category.as_deref()
    }

    fn tier2_category(&self) -> Option<&str> {
        self.tier2_category.as_deref()
    }
}

impl Costed for Material {
    fn cost(&self) -> f64 {
        self.total_cost()
    }
}

impl Categorized for Contact {
    fn tier1_category(&self) -> Option<&str> {
        self.tier1_category.as_deref()
    }

    fn tier2_category(&self) -> Option<&str> {
        self.tier2_category.as_deref()
    }
}

/// round(100 * completed / total), 0 for an empty group.
pub fn completion_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (total * 2)) as u8
}

fn group_key(raw: Option<&str>, missing: &str) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => missing.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Tier2Group<'a, T> {
    pub name: String,
    pub items: Vec<&'a T>,
}

#[derive(Debug, Clone)]
pub struct Tier1Group<'a, T> {
    pub name: String,
    pub subgroups: Vec<Tier2Group<'a, T>>,
}

/// tier1 -> tier2 -> items, groups in first-seen order, items in input order.
#[derive(Debug, Clone)]
pub struct CategoryGroups<'a, T> {
    groups: Vec<Tier1Group<'a, T>>,
}

pub type TaskGroups<'a> = CategoryGroups<'a, Task>;

pub fn group_by_category<T: Categorized>(items: &[T]) -> CategoryGroups<'_, T> {
    let mut groups: Vec<Tier1Group<'_, T>> = Vec::new();
    let mut tier1_index: HashMap<String, usize> = HashMap::new();
    let mut tier2_index: HashMap<(usize, String), usize> = HashMap::new();

    for item in items {
        let tier1 = group_key(item.tier1_category(), UNCATEGORIZED);
        let tier2 = group_key(item.tier2_category(), OTHER);

        let t1 = *tier1_index.entry(tier1.clone()).or_insert_with(|| {
            groups.push(Tier1Group {
                name: tier1,
                subgroups: Vec::new(),
            });
            groups.len() - 1
        });

        let subgroups = &mut groups[t1].subgroups;
        let t2 = *tier2_index
            .entry((t1, tier2.clone()))
            .or_insert_with(|| {
                subgroups.push(Tier2Group {
                    name: tier2,
                    items: Vec::new(),
                });
                subgroups.len() - 1
            });
        subgroups[t2].items.push(item);
    }

    CategoryGroups { groups }
}

pub fn group_tasks(tasks: &[Task]) -> TaskGroups<'_> {
    group_by_category(tasks)
}

impl<'a, T> CategoryGroups<'a, T> {
    pub fn iter(&self) -> impl Iterator<Item = &Tier1Group<'a, T>> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn tier1(&self, name: &str) -> Option<&Tier1Group<'a, T>> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn tier2(&self, tier1: &str, tier2: &str) -> Option<&Tier2Group<'a, T>> {
        self.tier1(tier1).and_then(|group| group.tier2(tier2))
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(Tier1Group::len).sum()
    }
}

impl<'a, T> Tier1Group<'a, T> {
    pub fn tier2(&self, name: &str) -> Option<&Tier2Group<'a, T>> {
        self.subgroups.iter().find(|group| group.name == name)
    }

    pub fn items(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.subgroups
            .iter()
            .flat_map(|group| group.items.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.subgroups.iter().map(|group| group.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, T> Tier2Group<'a, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T: Completable> Tier1Group<'a, T> {
    pub fn completed_count(&self) -> usize {
        self.items().filter(|item| item.is_completed()).count()
    }

    pub fn completion_percent(&self) -> u8 {
        completion_percent(self.completed_count(), self.len())
    }
}

impl<'a, T: Completable> Tier2Group<'a, T> {
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed()).count()
    }

    pub fn completion_percent(&self) -> u8 {
        completion_percent(self.completed_count(), self.len())
    }
}

impl<'a, T: Costed> Tier1Group<'a, T> {
    pub fn total_cost(&self) -> f64 {
        self.items().map(Costed::cost).sum()
    }
}

impl<'a, T: Costed> Tier2Group<'a, T> {
    pub fn total_cost(&self) -> f64 {
        self.items.iter().map(|item| item.cost()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::task;
    use crate::{EntityId, TaskStatus};

    fn ids<'a>(items: impl Iterator<Item = &'a Task>) -> Vec<u64> {
        items.map(|task| task.id.get()).collect()
    }

    #[test]
    fn empty_input_yields_empty_mapping() {
        let groups = group_tasks(&[]);
        assert!(groups.is_empty());
        assert_eq!(groups.item_count(), 0);
    }

    #[test]
    fn grouping_preserves_count_and_order() {
        let tasks = vec![
            task(1, Some("structural"), Some("framing"), TaskStatus::Completed),
            task(2, Some("systems"), Some("electrical"), TaskStatus::InProgress),
            task(3, Some("structural"), Some("foundation"), TaskStatus::NotStarted),
            task(4, Some("structural"), Some("framing"), TaskStatus::OnHold),
            task(5, None, None, TaskStatus::NotStarted),
        ];
        let groups = group_tasks(&tasks);

        assert_eq!(groups.item_count(), tasks.len());
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["structural", "systems", UNCATEGORIZED]);

        let framing = groups.tier2("structural", "framing").expect("framing group");
        assert_eq!(ids(framing.items.iter().copied()), vec![1, 4]);
        let structural = groups.tier1("structural").expect("structural group");
        assert_eq!(ids(structural.items()), vec![1, 4, 3]);
    }

    #[test]
    fn missing_categories_land_in_default_buckets() {
        let tasks = vec![
            task(1, None, Some("framing"), TaskStatus::NotStarted),
            task(2, Some("systems"), None, TaskStatus::NotStarted),
            task(3, Some("  "), Some(""), TaskStatus::NotStarted),
        ];
        let groups = group_tasks(&tasks);

        let uncategorized = groups.tier1(UNCATEGORIZED).expect("uncategorized");
        assert_eq!(ids(uncategorized.items()), vec![1, 3]);
        assert_eq!(
            ids(groups
                .tier2(UNCATEGORIZED, OTHER)
                .expect("other under uncategorized")
                .items
                .iter()
                .copied()),
            vec![3]
        );
        assert_eq!(
            ids(groups
                .tier2("systems", OTHER)
                .expect("other under systems")
                .items
                .iter()
                .copied()),
            vec![2]
        );
    }

    #[test]
    fn completion_percentages_round_and_stay_in_range() {
        let tasks = vec![
            task(1, Some("structural"), Some("framing"), TaskStatus::Completed),
            task(2, Some("structural"), Some("framing"), TaskStatus::InProgress),
            task(3, Some("structural"), Some("framing"), TaskStatus::InProgress),
            task(4, Some("structural"), Some("roofing"), TaskStatus::Completed),
        ];
        let groups = group_tasks(&tasks);
        let structural = groups.tier1("structural").expect("structural");
        assert_eq!(structural.completed_count(), 2);
        assert_eq!(structural.completion_percent(), 50);
        assert_eq!(
            groups
                .tier2("structural", "framing")
                .expect("framing")
                .completion_percent(),
            33
        );
        assert_eq!(
            groups
                .tier2("structural", "roofing")
                .expect("roofing")
                .completion_percent(),
            100
        );
    }

    #[test]
    fn completion_percent_handles_edges() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 2), 50);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(5, 3), 100);
        for total in 0..20 {
            for done in 0..=total {
                assert!(completion_percent(done, total) <= 100);
            }
        }
    }

    #[test]
    fn generated_lists_keep_every_task_and_bounded_percentages() {
        const TIER1: [Option<&str>; 5] = [Some("structural"), Some("systems"), None, Some("  "), Some("finishes")];
        const TIER2: [Option<&str>; 4] = [Some("framing"), None, Some(""), Some("electrical")];
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: usize| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % bound as u64) as usize
        };

        for len in 0..60 {
            let tasks: Vec<Task> = (0..len)
                .map(|id| {
                    task(
                        id as u64,
                        TIER1[next(TIER1.len())],
                        TIER2[next(TIER2.len())],
                        TaskStatus::ALL[next(TaskStatus::ALL.len())],
                    )
                })
                .collect();
            let groups = group_tasks(&tasks);

            let leaves: usize = groups
                .iter()
                .flat_map(|tier1| tier1.subgroups.iter())
                .map(Tier2Group::len)
                .sum();
            assert_eq!(leaves, tasks.len());
            assert_eq!(groups.item_count(), tasks.len());

            for tier1 in groups.iter() {
                assert!(tier1.completion_percent() <= 100);
                for tier2 in &tier1.subgroups {
                    assert!(!tier2.is_empty());
                    assert!(tier2.completion_percent() <= 100);
                }
            }
            for task in &tasks {
                let tier1 = group_key(task.tier1_category.as_deref(), UNCATEGORIZED);
                let tier2 = group_key(task.tier2_category.as_deref(), OTHER);
                let leaf = groups.tier2(&tier1, &tier2).expect("task's leaf group");
                assert!(leaf.items.iter().any(|item| item.id == task.id));
            }
        }
    }

    #[test]
    fn labor_groups_roll_up_cost() {
        let labor = vec![
            Labor {
                id: EntityId::new(1),
                project_id: None,
                task_id: None,
                contact_id: None,
                full_name: "Ana".to_string(),
                tier1_category: Some("structural".to_string()),
                tier2_category: Some("framing".to_string()),
                work_date: None,
                total_hours: 8.0,
                hourly_rate: Some(50.0),
                labor_cost: None,
                task_description: None,
            },
            Labor {
                id: EntityId::new(2),
                project_id: None,
                task_id: None,
                contact_id: None,
                full_name: "Ben".to_string(),
                tier1_category: Some("structural".to_string()),
                tier2_category: None,
                work_date: None,
                total_hours: 2.0,
                hourly_rate: None,
                labor_cost: Some(90.0),
                task_description: None,
            },
        ];
        let groups = group_by_category(&labor);
        let structural = groups.tier1("structural").expect("structural");
        assert_eq!(structural.total_cost(), 490.0);
        assert_eq!(
            groups.tier2("structural", OTHER).expect("other").total_cost(),
            90.0
        );
    }
}
