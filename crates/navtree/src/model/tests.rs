use std::sync::atomic::{AtomicUsize, Ordering};

use opsdeck_ops::Typed;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::fixtures::*;

fn source() -> NavSource {
	NavSource::new(NavTreeBuilder::new(), Arc::new(cache()))
}

fn shape<S>(tree: &DisplayTree<NavNode, S>) -> Vec<(usize, String)> {
	tree.walk()
		.into_iter()
		.map(|(depth, node)| (depth, node.label().to_string()))
		.collect()
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(&()) + Send + Sync + 'static) {
	let count = Arc::new(AtomicUsize::new(0));
	let bump = count.clone();
	(count, move |_: &()| {
		bump.fetch_add(1, Ordering::Relaxed);
	})
}

#[test]
fn test_register_rebuilds_and_notifies() {
	let mut source = source();
	let (changes, callback) = counter();
	let _ = source.on_change(callback);

	assert_eq!(source.register(Animal::TYPE), Ok(true));
	assert_eq!(source.register(Dog::TYPE), Ok(true));
	assert_eq!(source.register(Dog::TYPE), Ok(false));
	assert_eq!(changes.load(Ordering::Relaxed), 2);
	assert_eq!(source.types(), &[Animal::TYPE, Dog::TYPE]);
	assert_eq!(source.forest().len(), 2);

	assert_eq!(source.unregister(Dog::TYPE), Ok(true));
	assert_eq!(source.unregister(Dog::TYPE), Ok(false));
	assert_eq!(changes.load(Ordering::Relaxed), 3);
	assert!(source.forest().get(Dog::TYPE).is_none());
}

#[test]
fn test_failed_registration_keeps_previous_forest() {
	let table = opsdeck_ops::MethodTable::builder("mixed")
		.extend([&DOGS_ALL, &PLANTS_BROKEN])
		.build();
	let mut source = NavSource::new(NavTreeBuilder::new(), Arc::new(OperationCache::new(Arc::new(table), None)));
	let (changes, callback) = counter();
	let _ = source.on_change(callback);

	source.register(Dog::TYPE).unwrap();
	assert!(matches!(source.register(Plant::TYPE), Err(RegistrationError::SequenceAction { .. })));
	assert_eq!(source.types(), &[Dog::TYPE]);
	assert_eq!(source.forest().len(), 1);
	assert_eq!(changes.load(Ordering::Relaxed), 1);
}

#[test]
fn test_refresh_follows_the_source() {
	let mut source = source();
	source.register(Animal::TYPE).unwrap();
	source.register(Dog::TYPE).unwrap();

	let mut model = NavTreeModel::<bool>::new();
	let report = model.refresh(&source);
	assert_eq!(report.inserted, 2);
	assert_eq!(shape(model.tree()), vec![(0, "Animal".to_string()), (1, "Dog".to_string())]);

	source.register(GoldenRetriever::TYPE).unwrap();
	source.register(Cat::TYPE).unwrap();
	let report = model.refresh(&source);
	assert_eq!(
		report,
		SyncReport {
			inserted: 2,
			moved: 0,
			removed: 0,
		}
	);
	assert_eq!(
		shape(model.tree()),
		vec![
			(0, "Animal".to_string()),
			(1, "Dog".to_string()),
			(2, "Golden Retriever".to_string()),
			(1, "Cat".to_string()),
		]
	);
}

#[test]
fn test_refresh_preserves_display_state() {
	let mut source = source();
	source.register(Dog::TYPE).unwrap();
	source.register(GoldenRetriever::TYPE).unwrap();

	let mut model = NavTreeModel::<bool>::new();
	model.refresh(&source);
	let dog_id = model.tree().roots()[0];
	let golden = model.tree().children(Some(dog_id))[0];
	*model.tree_mut().state_mut(golden).unwrap() = true;

	// a new common ancestor pushes both nodes one level down
	source.register(Animal::TYPE).unwrap();
	let report = model.refresh(&source);
	assert_eq!(report.inserted, 1);
	assert_eq!(report.removed, 0);

	let dog = source.forest().get(Dog::TYPE).unwrap();
	assert_eq!(model.tree().find(dog), Some(dog_id));
	assert_eq!(model.tree().parent(golden), Some(dog_id));
	assert_eq!(model.tree().state(golden), Some(&true));
	assert_eq!(model.tree().parent(dog_id), model.tree().roots().first().copied());
}

#[test]
fn test_listeners_only_hear_real_changes() {
	let mut source = source();
	source.register(Animal::TYPE).unwrap();

	let mut model = NavTreeModel::<()>::new();
	let reports = Arc::new(Mutex::new(Vec::new()));
	let seen = reports.clone();
	let sub = model.on_refresh(move |report| seen.lock().push(*report));

	model.refresh(&source);
	model.refresh(&source);
	source.rebuild().unwrap();
	model.refresh(&source);
	assert_eq!(reports.lock().len(), 1);

	source.unregister(Animal::TYPE).unwrap();
	model.refresh(&source);
	assert_eq!(
		*reports.lock(),
		[
			SyncReport {
				inserted: 1,
				moved: 0,
				removed: 0,
			},
			SyncReport {
				inserted: 0,
				moved: 0,
				removed: 1,
			},
		]
	);
	assert!(model.tree().is_empty());

	assert!(model.unsubscribe(sub));
	source.register(Cat::TYPE).unwrap();
	model.refresh(&source);
	assert_eq!(reports.lock().len(), 2);
}
