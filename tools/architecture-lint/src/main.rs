//! `architecture-lint [backend-dir]`
//!
//! Without an argument the backend crate is found by walking up from the
//! current directory, then from this crate's manifest directory.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(backend_dir) = env::args_os().nth(1).map(PathBuf::from).or_else(locate_backend)
    else {
        let _ = writeln!(
            io::stderr().lock(),
            "no backend crate found; pass its directory as the first argument"
        );
        return ExitCode::FAILURE;
    };
    match architecture_lint::lint_backend(&backend_dir) {
        Ok(checked) => {
            let _ = writeln!(
                io::stdout().lock(),
                "{}: {checked} files respect the layer boundaries",
                backend_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = write!(io::stderr().lock(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn locate_backend() -> Option<PathBuf> {
    let from_cwd = env::current_dir().ok();
    let from_manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    from_cwd
        .as_deref()
        .and_then(backend_above)
        .or_else(|| backend_above(&from_manifest))
}

fn backend_above(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        [dir.to_path_buf(), dir.join("backend")]
            .into_iter()
            .find(|candidate| candidate.join("src/domain").is_dir())
    })
}
