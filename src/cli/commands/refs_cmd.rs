//! refs command - List the references and stashes feeding the graph

use anyhow::Result;

use super::load_snapshot;
use crate::cli::Context;
use crate::ui::output::{self, SHORT_OID_LEN};

/// List references, stash entries and HEAD as the graph sees them.
pub fn refs(ctx: &Context) -> Result<()> {
    let snapshot = load_snapshot(ctx)?;

    for (name, oid) in snapshot.references() {
        println!("{} {}", oid.short(SHORT_OID_LEN), name);
    }
    for stash in snapshot.stashes() {
        println!("{} stash@{{{}}}", stash.oid.short(SHORT_OID_LEN), stash.index);
    }

    let head = snapshot.head();
    match (&head.branch, &head.oid) {
        (Some(branch), _) => output::print(format!("HEAD -> {}", branch.short_name()), ctx.verbosity),
        (None, Some(oid)) => output::print(
            format!("HEAD detached at {}", oid.short(SHORT_OID_LEN)),
            ctx.verbosity,
        ),
        (None, None) => output::print("HEAD unborn", ctx.verbosity),
    }

    Ok(())
}
