//! Series-aware fairness across first-level folders.
//!
//! Given `Cartoons/A/1.mp4`, `Cartoons/A/Long/1.mp4`, `Cartoons/A/Long/2.mp4`
//! and `Cartoons/B/1.mp4` under the source `Cartoons`, folders `A` and `B`
//! take turns, and `A/Long` is delivered whole as one unit.

use super::candidate::Unit;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Group `files` into units and interleave their first-level folders.
///
/// `bases` are the source directories the files were discovered under.
pub fn group_units(files: &[PathBuf], bases: &[PathBuf]) -> Vec<Unit> {
    let mut order: Vec<PathBuf> = Vec::new();
    let mut groups: HashMap<PathBuf, Vec<Unit>> = HashMap::new();
    let mut series_index: HashMap<PathBuf, (PathBuf, usize)> = HashMap::new();

    for file in files {
        let parent = file.parent().unwrap_or_else(|| Path::new(""));
        let base = bases.iter().find(|b| file.starts_with(b));
        let relative_parent = base
            .and_then(|b| parent.strip_prefix(b).ok())
            .map(Path::to_path_buf);

        let (key, series) = match relative_parent {
            Some(rel) => {
                let mut components = rel.components();
                match components.next() {
                    Some(first) => {
                        let key = base
                            .map(|b| b.join(first.as_os_str()))
                            .unwrap_or_else(|| parent.to_path_buf());
                        (key, components.next().is_some())
                    }
                    None => (parent.to_path_buf(), false),
                }
            }
            // explicit files outside any source folder
            None => (parent.to_path_buf(), false),
        };

        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Vec::new()
        });

        if series {
            match series_index.get(parent) {
                Some((group_key, idx)) if *group_key == key => {
                    let mut existing = group[*idx].files().to_vec();
                    existing.push(file.clone());
                    group[*idx] = Unit::series(existing);
                }
                _ => {
                    series_index.insert(parent.to_path_buf(), (key.clone(), group.len()));
                    group.push(Unit::series(vec![file.clone()]));
                }
            }
        } else {
            group.push(Unit::single(file.clone()));
        }
    }

    let mut queues: Vec<std::vec::IntoIter<Unit>> = order
        .iter()
        .filter_map(|key| groups.remove(key))
        .map(Vec::into_iter)
        .collect();

    let mut units = Vec::new();
    while !queues.is_empty() {
        for queue in queues.iter_mut() {
            units.extend(queue.next());
        }
        queues.retain(|q| !q.as_slice().is_empty());
    }
    units
}
