use super::repo::DeleteResult;
use booking_rules_domain::{Entity, ID};
use std::sync::Mutex;

/// Useful functions for creating inmemory repositories

pub fn insert<T: Clone>(val: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.push(val.clone());
}

pub fn save<T: Clone + Entity>(val: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    if let Some(existing) = collection.iter_mut().find(|item| item.id() == val.id()) {
        *existing = val.clone();
    }
}

/// Replaces the first item matching `same` or inserts `val`.
/// Returns the stored item.
pub fn upsert_by<T: Clone, F: Fn(&T) -> bool, U: FnOnce(&mut T)>(
    val: &T,
    collection: &Mutex<Vec<T>>,
    same: F,
    update: U,
) -> T {
    let mut collection = collection.lock().unwrap();
    match collection.iter_mut().find(|item| same(item)) {
        Some(existing) => {
            update(existing);
            existing.clone()
        }
        None => {
            collection.push(val.clone());
            val.clone()
        }
    }
}

pub fn find<T: Clone + Entity>(val_id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let collection = collection.lock().unwrap();
    collection.iter().find(|item| item.id() == val_id).cloned()
}

pub fn find_by<T: Clone, F: FnMut(&T) -> bool>(collection: &Mutex<Vec<T>>, mut compare: F) -> Vec<T> {
    let collection = collection.lock().unwrap();
    collection.iter().filter(|item| compare(item)).cloned().collect()
}

pub fn delete<T: Clone + Entity>(val_id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let mut collection = collection.lock().unwrap();
    let index = collection.iter().position(|item| item.id() == val_id)?;
    Some(collection.remove(index))
}

pub fn delete_by<T: Clone, F: Fn(&T) -> bool>(collection: &Mutex<Vec<T>>, compare: F) -> DeleteResult {
    let mut collection = collection.lock().unwrap();
    let before = collection.len();
    collection.retain(|item| !compare(item));
    DeleteResult {
        deleted_count: (before - collection.len()) as i64,
    }
}

pub fn update_many<T: Clone, F: Fn(&T) -> bool, U: Fn(&mut T)>(
    collection: &Mutex<Vec<T>>,
    compare: F,
    update: U,
) {
    let mut collection = collection.lock().unwrap();
    for item in collection.iter_mut().filter(|item| compare(item)) {
        update(item);
    }
}
