//! Small zoo domain used by the unit tests.

use std::sync::Arc;

use opsdeck_ops::{Args, Marker, MethodDef, MethodTable, Object, OpError, OperationCache, Output, Receiver, ReturnType, Typed};

pub struct Animal;
pub struct Dog;
pub struct Cat;
pub struct GoldenRetriever;
pub struct Plant;

/// Two unrelated roles sharing the [`ServiceDog`] subtype.
pub struct Pet;
pub struct Worker;
pub struct ServiceDog;

opsdeck_ops::data_type!(Animal);
opsdeck_ops::data_type!(Dog: Animal);
opsdeck_ops::data_type!(Cat: Animal);
opsdeck_ops::data_type!(GoldenRetriever: Dog);
opsdeck_ops::data_type!(Plant);
opsdeck_ops::data_type!(Pet);
opsdeck_ops::data_type!(Worker);
opsdeck_ops::data_type!(ServiceDog: Pet, Worker);

fn nothing(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Sequence(Box::new(std::iter::empty())))
}

fn unit(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Unit)
}

pub static DOGS_ALL: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "all",
	marker: Marker::query("All Dogs"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Sequence(Dog::TYPE),
	invoke: nothing,
};

pub static DOGS_FEED: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "feed",
	marker: Marker::action("Feed Dogs"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Unit,
	invoke: unit,
};

/// Lists cats, but typed as animals, so it is not a default query.
pub static CATS_ALL: MethodDef = MethodDef {
	owner: Cat::TYPE,
	name: "all",
	marker: Marker::query("All Cats"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Sequence(Animal::TYPE),
	invoke: nothing,
};

/// Action declaring a sequence result, rejected at discovery.
pub static PLANTS_BROKEN: MethodDef = MethodDef {
	owner: Plant::TYPE,
	name: "broken",
	marker: Marker::action("Broken"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Sequence(Plant::TYPE),
	invoke: nothing,
};

pub fn cache() -> OperationCache {
	let table = MethodTable::builder("zoo").extend([&DOGS_ALL, &DOGS_FEED, &CATS_ALL]).build();
	OperationCache::new(Arc::new(table), None)
}

pub fn broken_cache() -> OperationCache {
	let table = MethodTable::builder("broken").push(&PLANTS_BROKEN).build();
	OperationCache::new(Arc::new(table), None)
}
