use super::*;
use crate::fixtures::{self, DOG_RENAME, DOG_TOYS, DOGS_ADOPT, DOGS_ALL, Dog, Toy};
use crate::types::Typed;

fn noop(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Unit)
}

static DOGS_ALL_AGAIN: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "all",
	marker: Marker::query("Every Dog"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Sequence(Dog::TYPE),
	invoke: noop,
};

static GLOBAL_TOY_COUNT: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "count",
	marker: Marker::action("Count Toys"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Value(u64::TYPE),
	invoke: noop,
};

inventory::submit! { MethodReg(&GLOBAL_TOY_COUNT) }

#[test]
fn test_methods_keep_registration_order() {
	let table = fixtures::table();
	let names: Vec<_> = table.methods_of(Dog::TYPE).iter().map(|d| d.name).collect();
	assert_eq!(names, ["all", "search", "adopt", "rename", "toys"]);
	assert_eq!(table.len(), 9);
	assert!(table.methods_of(u64::TYPE).is_empty());
}

#[test]
fn test_marked_filters_by_kind() {
	let table = fixtures::table();
	let queries: Vec<_> = table.marked(Dog::TYPE, MarkerKind::Query).map(|d| d.name).collect();
	let actions: Vec<_> = table.marked(Dog::TYPE, MarkerKind::Action).map(|d| d.name).collect();
	assert_eq!(queries, ["all", "search", "toys"]);
	assert_eq!(actions, ["adopt", "rename"]);
}

#[test]
fn test_same_definition_pushed_twice_is_deduplicated() {
	let table = MethodTable::builder("dedupe")
		.duplicate_policy(DuplicatePolicy::Panic)
		.push(&DOGS_ALL)
		.push(&DOGS_ALL)
		.build();
	assert_eq!(table.len(), 1);
}

#[test]
#[should_panic(expected = "duplicate method in clash")]
fn test_duplicate_panics() {
	let _ = MethodTable::builder("clash")
		.duplicate_policy(DuplicatePolicy::Panic)
		.push(&DOGS_ALL)
		.push(&DOGS_ALL_AGAIN)
		.build();
}

#[test]
fn test_duplicate_first_wins() {
	let table = MethodTable::builder("first")
		.duplicate_policy(DuplicatePolicy::FirstWins)
		.extend([&DOGS_ALL, &DOGS_ADOPT, &DOGS_ALL_AGAIN])
		.build();
	let labels: Vec<_> = table.methods_of(Dog::TYPE).iter().map(|d| d.marker.label).collect();
	assert_eq!(labels, ["All Dogs", "Adopt Dog"]);
}

#[test]
fn test_duplicate_last_wins_keeps_position() {
	let table = MethodTable::builder("last")
		.duplicate_policy(DuplicatePolicy::LastWins)
		.extend([&DOGS_ALL, &DOGS_ADOPT, &DOGS_ALL_AGAIN])
		.build();
	let labels: Vec<_> = table.methods_of(Dog::TYPE).iter().map(|d| d.marker.label).collect();
	assert_eq!(labels, ["Every Dog", "Adopt Dog"]);
	assert_eq!(table.len(), 2);
}

#[test]
fn test_extend_inventory_collects_submitted_methods() {
	let table = MethodTable::builder("inventory").extend_inventory().build();
	assert!(table.methods_of(Toy::TYPE).iter().any(|d| d.name == "count"));
	assert!(MethodTable::global().marked(Toy::TYPE, MarkerKind::Action).any(|d| d.name == "count"));
}

#[test]
fn test_qualified_name_and_marker_description() {
	assert_eq!(DOG_RENAME.qualified_name(), "Dog::rename");
	assert_eq!(DOG_RENAME.marker.description(), "#[action]");
	assert_eq!(DOG_TOYS.marker.description(), "#[query]");
	assert!(!DOG_TOYS.is_static());
	assert!(DOGS_ALL.is_static());
}

#[test]
fn test_args_accessors() {
	let mut args = Args::default();
	args.push(Arg::Context(fixtures::kennel()));
	args.push(Arg::Progress(ProgressReporter::discard()));
	args.push(Arg::Config(Object::new(fixtures::DogFilter { prefix: "r".into() })));

	assert_eq!(args.len(), 3);
	assert_eq!(args.context_as::<fixtures::Kennel>().map(|k| k.names.len()).ok(), Some(3));
	assert_eq!(args.config_as::<fixtures::DogFilter>().map(|f| f.prefix.as_str()).ok(), Some("r"));
	assert!(args.reporter().is_ok());
	assert!(matches!(args.config_as::<Dog>(), Err(OpError::InvalidArgument(_))));

	let empty = Args::default();
	assert!(empty.is_empty());
	assert!(matches!(empty.reporter(), Err(OpError::InvalidArgument(_))));
}
