use std::error::Error;

use vergen_gitcl::{CargoBuilder, Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn Error>> {
	let mut emitter = Emitter::default();

	emitter.add_instructions(&CargoBuilder::default().target_triple(true).build()?)?;

	// Builds from a source tarball have no git metadata.
	let with_git = emitter
		.clone()
		.add_instructions(&GitclBuilder::default().sha(true).build()?)?
		.fail_on_error()
		.emit();

	if with_git.is_err() {
		println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");

		emitter.emit()?;
	}

	Ok(())
}
