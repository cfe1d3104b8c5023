use crate::model::{Task, TaskId};

use super::{move_by_identity, StoreEvent, TaskField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
}

impl TaskSummary {
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    pub fn label(&self) -> String {
        if self.total == 0 {
            return "No tasks yet".to_string();
        }
        if self.completed == self.total {
            return format!("All done! 🎉 ({} tasks completed)", self.total);
        }
        format!(
            "{} pending • {} completed • {} total",
            self.pending(),
            self.completed,
            self.total
        )
    }
}

/// Ordered task list. Index 0 is the top of the list.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    items: Vec<Task>,
}

impl TaskList {
    pub fn from_tasks(items: Vec<Task>) -> Self {
        let mut list = Self { items };
        for task in &mut list.items {
            task.is_editing = false;
            task.edit_title.clear();
        }
        list
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    pub fn index_of(&self, id: TaskId) -> Option<usize> {
        self.items.iter().position(|task| task.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.items.iter_mut().find(|task| task.id == id)
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            total: self.items.len(),
            completed: self.items.iter().filter(|task| task.is_completed).count(),
        }
    }

    pub fn can_clear_completed(&self) -> bool {
        self.items.iter().any(|task| task.is_completed)
    }

    pub fn editing(&self) -> Option<&Task> {
        self.items.iter().find(|task| task.is_editing)
    }

    /// Inserts a new task at the head of the list. Blank titles are ignored.
    pub fn add(&mut self, title: &str) -> Option<StoreEvent> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let task = Task::new(title);
        let id = task.id;
        self.items.insert(0, task);
        Some(StoreEvent::TaskAdded { id, index: 0 })
    }

    pub fn remove(&mut self, id: TaskId) -> Option<StoreEvent> {
        let index = self.index_of(id)?;
        self.items.remove(index);
        Some(StoreEvent::TaskRemoved { id })
    }

    pub fn clear_completed(&mut self) -> Option<StoreEvent> {
        let ids: Vec<TaskId> = self
            .items
            .iter()
            .filter(|task| task.is_completed)
            .map(|task| task.id)
            .collect();
        if ids.is_empty() {
            return None;
        }
        self.items.retain(|task| !task.is_completed);
        Some(StoreEvent::TasksCleared { ids })
    }

    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Option<StoreEvent> {
        let task = self.get_mut(id)?;
        if task.is_completed == completed {
            return None;
        }
        task.is_completed = completed;
        Some(StoreEvent::TaskChanged {
            id,
            field: TaskField::Completion,
        })
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> Option<StoreEvent> {
        let completed = self.get(id)?.is_completed;
        self.set_completed(id, !completed)
    }

    /// Drag-and-drop reorder: `source` takes the slot `target` occupies.
    pub fn move_task(&mut self, source: TaskId, target: TaskId) -> Option<StoreEvent> {
        let (from, to) = move_by_identity(&mut self.items, |task| task.id, &source, &target)?;
        Some(StoreEvent::TaskMoved {
            id: source,
            from,
            to,
        })
    }

    /// Enters edit mode for `id`, cancelling whichever task was being edited.
    pub fn start_edit(&mut self, id: TaskId) {
        if self.get(id).is_none() {
            return;
        }
        for task in self.items.iter_mut().filter(|task| task.is_editing) {
            clear_edit(task);
        }
        if let Some(task) = self.get_mut(id) {
            task.edit_title = task.title.clone();
            task.is_editing = true;
        }
    }

    pub fn set_edit_buffer(&mut self, id: TaskId, text: &str) {
        if let Some(task) = self.get_mut(id).filter(|task| task.is_editing) {
            task.edit_title.clear();
            task.edit_title.push_str(text);
        }
    }

    /// Commits the edit buffer when it holds a non-blank title. Edit mode is
    /// always left, even when the buffer was rejected.
    pub fn save_edit(&mut self, id: TaskId) -> Option<StoreEvent> {
        let task = self.get_mut(id).filter(|task| task.is_editing)?;
        let candidate = task.edit_title.trim().to_string();
        clear_edit(task);
        if candidate.is_empty() || candidate == task.title {
            return None;
        }
        task.title = candidate;
        Some(StoreEvent::TaskChanged {
            id,
            field: TaskField::Title,
        })
    }

    pub fn cancel_edit(&mut self, id: TaskId) {
        if let Some(task) = self.get_mut(id).filter(|task| task.is_editing) {
            clear_edit(task);
        }
    }
}

fn clear_edit(task: &mut Task) {
    task.is_editing = false;
    task.edit_title.clear();
}
