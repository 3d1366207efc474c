//! Categorized in-memory task store backing a project's Kanban board.
//!
//! Tasks are kept in a single id-keyed map. Each entry carries the sequence
//! number it received when it entered its current category, so a category is
//! the set of tasks whose status matches, ordered by that number. A task can
//! therefore never sit in two categories or in none.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{Category, InvalidCategory, Task, TaskEdit};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Task {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategory),
    #[error("Task {0} already exists")]
    DuplicateIdentifier(i64),
    #[error("No task ids left after {0}")]
    IdsExhausted(i64),
}

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    task: Task,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    slots: HashMap<i64, Slot>,
    next_seq: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Smallest id greater than every id currently held (1 for an empty store)
    pub fn next_id(&self) -> Result<i64, StoreError> {
        match self.slots.keys().max() {
            Some(&max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max)),
            None => Ok(1),
        }
    }

    /// Add a task to the Backlog, whatever status it carries
    pub fn create_task(&mut self, mut task: Task) -> Result<(), StoreError> {
        task.status = Category::Backlog;
        self.insert(task)
    }

    /// Load a persisted task into the category named by its own status
    pub fn restore(&mut self, task: Task) -> Result<(), StoreError> {
        self.insert(task)
    }

    fn insert(&mut self, task: Task) -> Result<(), StoreError> {
        if self.slots.contains_key(&task.id) {
            return Err(StoreError::DuplicateIdentifier(task.id));
        }
        let seq = self.bump();
        self.slots.insert(task.id, Slot { seq, task });
        Ok(())
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Look a task up by id
    pub fn find_task(&self, id: i64) -> Option<&Task> {
        self.slots.get(&id).map(|slot| &slot.task)
    }

    /// Copy of the task with the given id
    pub fn read_task(&self, id: i64) -> Result<Task, StoreError> {
        self.find_task(id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Apply a field-level edit to a stored task and return the edited copy
    pub fn edit_task(&mut self, id: i64, edit: TaskEdit) -> Result<Task, StoreError> {
        let slot = self.slots.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        edit.apply(&mut slot.task);
        Ok(slot.task.clone())
    }

    /// Move a task to the category named by `new_status`.
    ///
    /// The name is validated before anything changes: an unknown category
    /// leaves the task where it was. On success the task is appended to the
    /// end of its new category and the updated copy is returned.
    pub fn update_status(&mut self, id: i64, new_status: &str) -> Result<Task, StoreError> {
        if !self.slots.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let category: Category = new_status.parse()?;
        self.move_task(id, category)
    }

    /// Typed form of [`TaskStore::update_status`]
    pub fn move_task(&mut self, id: i64, category: Category) -> Result<Task, StoreError> {
        let seq = self.next_seq;
        let slot = self.slots.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        slot.task.status = category;
        slot.seq = seq;
        let moved = slot.task.clone();
        self.next_seq += 1;
        Ok(moved)
    }

    /// Remove a task and hand it back
    pub fn delete_task(&mut self, id: i64) -> Result<Task, StoreError> {
        self.slots
            .remove(&id)
            .map(|slot| slot.task)
            .ok_or(StoreError::NotFound(id))
    }

    /// Tasks of one category in board order
    pub fn tasks_in(&self, category: Category) -> Vec<Task> {
        let mut slots: Vec<&Slot> = self
            .slots
            .values()
            .filter(|slot| slot.task.status == category)
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.task.clone()).collect()
    }

    /// Tasks of the named category; an unknown name gives an empty list
    pub fn filter_by_category(&self, category: &str) -> Vec<Task> {
        category
            .parse::<Category>()
            .map(|category| self.tasks_in(category))
            .unwrap_or_default()
    }

    /// Every task whose priority equals `priority` exactly, Backlog first
    /// through Done, keeping each category's order
    pub fn filter_by_priority(&self, priority: &str) -> Vec<Task> {
        Category::ALL
            .iter()
            .flat_map(|category| self.tasks_in(*category))
            .filter(|task| task.priority == priority)
            .collect()
    }

    /// Number of tasks per category, in board order
    pub fn counts(&self) -> [(Category, usize); 4] {
        Category::ALL.map(|category| {
            let count = self
                .slots
                .values()
                .filter(|slot| slot.task.status == category)
                .count();
            (category, count)
        })
    }
}
