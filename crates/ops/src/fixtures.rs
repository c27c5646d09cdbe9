//! Shared kennel domain used by the unit tests.

use std::sync::Arc;

use crate::error::OpError;
use crate::method::{Args, Marker, MethodDef, MethodTable, Output, Receiver, ReturnType};
use crate::progress::{Progress, ProgressReporter};
use crate::types::{Object, Typed};

#[derive(Debug)]
pub struct Animal;

#[derive(Debug, Clone, PartialEq)]
pub struct Dog {
	pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toy {
	pub name: String,
}

/// Context object handed to every method with a context slot.
#[derive(Debug)]
pub struct Kennel {
	pub names: Vec<&'static str>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DogFilter {
	pub prefix: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Rename {
	pub from: String,
	pub to: String,
}

impl From<&Dog> for Rename {
	fn from(dog: &Dog) -> Self {
		Self {
			from: dog.name.clone(),
			to: String::new(),
		}
	}
}

/// Config type without any declared constructor.
#[derive(Debug)]
pub struct Opaque;

crate::data_type!(Animal);
crate::data_type!(Dog: Animal);
crate::data_type!(Toy);
crate::data_type!(Kennel);
crate::data_type!(DogFilter { default });
crate::data_type!(Rename { default, from: Dog });
crate::data_type!(Opaque);

pub fn kennel() -> Object {
	Object::new(Kennel {
		names: vec!["rex", "fido", "rover"],
	})
}

pub fn dog(name: &str) -> Object {
	Object::new(Dog { name: name.to_string() })
}

pub fn names(items: impl Iterator<Item = Object>) -> Vec<String> {
	items
		.map(|item| item.downcast_ref::<Dog>().map(|d| d.name.clone()).unwrap_or_default())
		.collect()
}

fn kennel_dogs(args: &Args, prefix: &str) -> Result<Output, OpError> {
	let kennel = args.context_as::<Kennel>()?;
	let dogs: Vec<Object> = kennel
		.names
		.iter()
		.filter(|name| name.starts_with(prefix))
		.map(|name| dog(name))
		.collect();
	Ok(Output::Sequence(Box::new(dogs.into_iter())))
}

fn dogs_all(_: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	args.reporter()?.report(Progress::ratio(1.0));
	kennel_dogs(args, "")
}

fn dogs_search(_: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	let filter = args.config_as::<DogFilter>()?;
	let progress = args.reporter()?;
	progress.checkpoint()?;
	progress.report(Progress::message("searching"));
	kennel_dogs(args, &filter.prefix)
}

fn dogs_adopt(_: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	let filter = args.config_as::<DogFilter>()?;
	Ok(Output::Value(dog(&filter.prefix)))
}

fn dog_rename(target: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	let dog = target
		.and_then(|t| t.downcast_ref::<Dog>())
		.ok_or_else(|| OpError::InvalidArgument("not a dog".to_string()))?;
	let rename = args.config_as::<Rename>()?;
	if rename.to.is_empty() {
		return Err(OpError::Other(format!("cannot rename {} to nothing", dog.name)));
	}
	Ok(Output::Unit)
}

fn dog_toys(target: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	let owner = target.and_then(|t| t.downcast_ref::<Dog>()).map(|d| d.name.clone()).unwrap_or_default();
	let toys = vec![
		Object::new(Toy {
			name: format!("{owner}'s ball"),
		}),
		Object::new(Toy {
			name: format!("{owner}'s rope"),
		}),
	];
	Ok(Output::Sequence(Box::new(toys.into_iter())))
}

fn toys_all(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Sequence(Box::new(std::iter::empty())))
}

fn toy_squeak(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Value(Object::new("squeak".to_string())))
}

fn wrong_shape(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Unit)
}

/// Requests its own cancellation, then stops at the next checkpoint.
fn toys_tidy(_: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	let progress = args.reporter()?;
	progress.cancel_token().cancel();
	progress.checkpoint()?;
	Ok(Output::Unit)
}

/// Requests its own cancellation, then fails with an ordinary error.
fn toys_sweep(_: Option<&Object>, args: &Args) -> Result<Output, OpError> {
	args.reporter()?.cancel_token().cancel();
	Err(OpError::Other("broom snapped".to_string()))
}

fn opaque_run(_: Option<&Object>, _: &Args) -> Result<Output, OpError> {
	Ok(Output::Unit)
}

pub static DOGS_ALL: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "all",
	marker: Marker::query("All Dogs"),
	receiver: Receiver::Static,
	params: &[Kennel::TYPE, ProgressReporter::TYPE],
	returns: ReturnType::Sequence(Dog::TYPE),
	invoke: dogs_all,
};

pub static DOGS_SEARCH: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "search",
	marker: Marker::query("Search Dogs"),
	receiver: Receiver::Static,
	params: &[Kennel::TYPE, ProgressReporter::TYPE, DogFilter::TYPE],
	returns: ReturnType::Sequence(Dog::TYPE),
	invoke: dogs_search,
};

pub static DOGS_ADOPT: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "adopt",
	marker: Marker::action("Adopt Dog"),
	receiver: Receiver::Static,
	params: &[DogFilter::TYPE],
	returns: ReturnType::Value(Dog::TYPE),
	invoke: dogs_adopt,
};

pub static DOG_RENAME: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "rename",
	marker: Marker::action("Rename"),
	receiver: Receiver::Instance,
	params: &[ProgressReporter::TYPE, Rename::TYPE],
	returns: ReturnType::Unit,
	invoke: dog_rename,
};

pub static DOG_TOYS: MethodDef = MethodDef {
	owner: Dog::TYPE,
	name: "toys",
	marker: Marker::query("Toys"),
	receiver: Receiver::Instance,
	params: &[],
	returns: ReturnType::Sequence(Toy::TYPE),
	invoke: dog_toys,
};

pub static TOYS_ALL: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "all",
	marker: Marker::query("All Toys"),
	receiver: Receiver::Static,
	params: &[],
	returns: ReturnType::Sequence(Toy::TYPE),
	invoke: toys_all,
};

pub static TOY_SQUEAK: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "squeak",
	marker: Marker::action("Squeak"),
	receiver: Receiver::Instance,
	params: &[],
	returns: ReturnType::Value(String::TYPE),
	invoke: toy_squeak,
};

/// Declares a sequence but hands back nothing.
pub static TOY_BROKEN: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "broken",
	marker: Marker::query("Broken"),
	receiver: Receiver::Instance,
	params: &[],
	returns: ReturnType::Sequence(Toy::TYPE),
	invoke: wrong_shape,
};

pub static TOYS_TIDY: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "tidy",
	marker: Marker::action("Tidy Toys"),
	receiver: Receiver::Static,
	params: &[ProgressReporter::TYPE],
	returns: ReturnType::Unit,
	invoke: toys_tidy,
};

pub static TOYS_SWEEP: MethodDef = MethodDef {
	owner: Toy::TYPE,
	name: "sweep",
	marker: Marker::action("Sweep Toys"),
	receiver: Receiver::Static,
	params: &[ProgressReporter::TYPE],
	returns: ReturnType::Unit,
	invoke: toys_sweep,
};

/// Static action whose config type has no constructor.
pub static OPAQUE_RUN: MethodDef = MethodDef {
	owner: Opaque::TYPE,
	name: "run",
	marker: Marker::action("Run"),
	receiver: Receiver::Static,
	params: &[Kennel::TYPE, Opaque::TYPE],
	returns: ReturnType::Unit,
	invoke: opaque_run,
};

/// Every well-formed kennel method, in registration order.
pub fn table() -> Arc<MethodTable> {
	Arc::new(
		MethodTable::builder("kennel")
			.extend([
				&DOGS_ALL,
				&DOGS_SEARCH,
				&DOGS_ADOPT,
				&DOG_RENAME,
				&DOG_TOYS,
				&TOYS_ALL,
				&TOY_SQUEAK,
				&TOY_BROKEN,
				&OPAQUE_RUN,
			])
			.build(),
	)
}

/// Toy actions that cancel themselves while running.
pub fn self_cancelling_table() -> Arc<MethodTable> {
	Arc::new(MethodTable::builder("tidy").extend([&TOYS_TIDY, &TOYS_SWEEP]).build())
}
