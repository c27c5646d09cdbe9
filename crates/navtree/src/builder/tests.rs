use opsdeck_ops::{Operation, RegistrationError, Typed};
use pretty_assertions::assert_eq;

use super::*;
use crate::fixtures::*;

fn labels(nodes: &[NavNode]) -> Vec<&str> {
	nodes.iter().map(NavNode::label).collect()
}

#[test]
fn test_types_hang_under_their_ancestor() {
	let forest = NavTreeBuilder::new()
		.build(&[Animal::TYPE, Dog::TYPE, Cat::TYPE, Plant::TYPE], &cache())
		.unwrap();

	assert_eq!(labels(forest.roots()), ["Animal", "Plant"]);
	let animal = forest.get(Animal::TYPE).unwrap();
	assert_eq!(labels(animal.children()), ["Dog", "Cat"]);
	assert!(forest.get(Plant::TYPE).unwrap().children().is_empty());
	assert_eq!(forest.len(), 4);
	assert!(forest.get(GoldenRetriever::TYPE).is_none());
}

#[test]
fn test_nearest_ancestor_wins() {
	let forest = NavTreeBuilder::new()
		.build(&[GoldenRetriever::TYPE, Animal::TYPE, Dog::TYPE], &cache())
		.unwrap();

	assert_eq!(labels(forest.roots()), ["Animal"]);
	let dog = forest.get(Dog::TYPE).unwrap();
	assert_eq!(labels(dog.children()), ["Golden Retriever"]);
	assert!(forest.roots()[0].children()[0].ptr_eq(dog));
}

#[test]
fn test_missing_intermediate_type_links_directly() {
	let forest = NavTreeBuilder::new()
		.build(&[Animal::TYPE, GoldenRetriever::TYPE], &cache())
		.unwrap();
	assert_eq!(labels(forest.roots()), ["Animal"]);
	assert_eq!(labels(forest.roots()[0].children()), ["Golden Retriever"]);
}

#[test]
fn test_diamond_picks_first_ancestor() {
	let builder = NavTreeBuilder::new();
	let forest = builder
		.build(&[Pet::TYPE, Worker::TYPE, ServiceDog::TYPE], &cache())
		.unwrap();
	assert_eq!(labels(forest.get(Pet::TYPE).unwrap().children()), ["Service Dog"]);
	assert!(forest.get(Worker::TYPE).unwrap().children().is_empty());

	let forest = builder
		.build(&[Worker::TYPE, Pet::TYPE, ServiceDog::TYPE], &cache())
		.unwrap();
	assert_eq!(labels(forest.get(Worker::TYPE).unwrap().children()), ["Service Dog"]);
}

#[test]
fn test_repeated_types_are_ignored() {
	let forest = NavTreeBuilder::new()
		.build(&[Animal::TYPE, Dog::TYPE, Animal::TYPE], &cache())
		.unwrap();
	assert_eq!(forest.len(), 2);
	assert_eq!(labels(forest.roots()), ["Animal"]);
}

#[test]
fn test_nodes_carry_operations() {
	let forest = NavTreeBuilder::new()
		.build(&[Animal::TYPE, Dog::TYPE, Cat::TYPE], &cache())
		.unwrap();

	let dog = forest.get(Dog::TYPE).unwrap();
	assert_eq!(dog.default_query().map(|q| q.label()), Some("All Dogs"));
	assert_eq!(dog.queries().len(), 1);
	assert_eq!(dog.actions().iter().map(|a| a.label()).collect::<Vec<_>>(), ["Feed Dogs"]);

	let cat = forest.get(Cat::TYPE).unwrap();
	assert!(cat.default_query().is_none());
	assert_eq!(cat.queries().len(), 1);

	let animal = forest.get(Animal::TYPE).unwrap();
	assert!(animal.default_query().is_none());
	assert!(animal.queries().is_empty());
	assert!(animal.actions().is_empty());
}

#[test]
fn test_custom_labeler() {
	let forest = NavTreeBuilder::new()
		.labeler(|ty| ty.simple_name().to_lowercase())
		.build(&[Animal::TYPE, GoldenRetriever::TYPE], &cache())
		.unwrap();
	assert_eq!(labels(forest.roots()), ["animal"]);
	assert_eq!(labels(forest.roots()[0].children()), ["goldenretriever"]);
}

#[test]
fn test_rebuilt_nodes_compare_equal() {
	let builder = NavTreeBuilder::new();
	let cache = cache();
	let first = builder.build(&[Animal::TYPE, Dog::TYPE], &cache).unwrap();
	let second = builder.build(&[Animal::TYPE, Dog::TYPE, Cat::TYPE], &cache).unwrap();

	let (a, b) = (first.get(Dog::TYPE).unwrap(), second.get(Dog::TYPE).unwrap());
	assert_eq!(a, b);
	assert!(!a.ptr_eq(b));
	assert_ne!(first.get(Animal::TYPE).unwrap(), b);
}

#[test]
fn test_registration_errors_propagate() {
	let err = NavTreeBuilder::new().build(&[Plant::TYPE], &broken_cache()).unwrap_err();
	assert!(matches!(err, RegistrationError::SequenceAction { .. }));
}

#[test]
fn test_forest_as_source_tree() {
	let forest = NavTreeBuilder::new()
		.build(&[Animal::TYPE, Dog::TYPE, Plant::TYPE], &cache())
		.unwrap();
	let roots: Vec<NavNode> = SourceTree::roots(&forest).collect();
	assert_eq!(labels(&roots), ["Animal", "Plant"]);
	let children: Vec<NavNode> = SourceTree::children(&forest, &roots[0]).collect();
	assert_eq!(labels(&children), ["Dog"]);
}
