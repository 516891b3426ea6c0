//! One pass over one project: collect, validate, synthesize, patch.

use chrono::NaiveDateTime;

use crate::command::CommandRunner;
use crate::config::Settings;
use crate::declaration::{synthesize, Synthesis};
use crate::git::{collect, RepositoryMetadata, RepositoryStatus};
use crate::global_var::{patch, Patch};
use crate::locate;
use crate::project::{build_metadata, BuildMetadata};
use crate::render::Generator;
use crate::types::BuildVersionError;

#[derive(Debug, Clone)]
pub struct Report {
    pub status: RepositoryStatus,
    pub repository: RepositoryMetadata,
    pub build: BuildMetadata,
    /// `None` when no program directory was found.
    pub declaration: Option<Synthesis>,
    pub global: Patch,
}

impl Report {
    pub fn initialized(&self) -> bool {
        self.declaration.is_some() || matches!(self.global, Patch::Patched(_))
    }
}

/// Metadata of both records, before anything is written.
pub fn gather<R: CommandRunner + ?Sized>(
    settings: &Settings,
    runner: &R,
    now: NaiveDateTime,
) -> Result<(RepositoryStatus, RepositoryMetadata, BuildMetadata), BuildVersionError> {
    let policy = &settings.policy;

    let collection = {
        let _span = tracing::info_span!("collect").entered();
        collect(runner, &settings.project_root)
    };
    match collection.status {
        RepositoryStatus::Available => {}
        status if policy.error_on_repository_check_failure => {
            let reason = match status {
                RepositoryStatus::ToolMissing => "git is not available".to_string(),
                _ => format!("{} is not a git repository", settings.project_root.display()),
            };
            return Err(BuildVersionError::RepositoryCheck(reason));
        }
        _ => log::warn!("repository information unavailable, using fallback values for every field"),
    }
    if !collection.warnings.is_empty() {
        log::info!("{} repository field(s) use fallback values", collection.warnings.len());
    }
    let repo = collection.metadata;
    if repo.has_uncommitted_changes {
        if policy.error_on_uncommitted_changes {
            return Err(BuildVersionError::UncommittedChanges(repo.uncommitted_changes));
        }
        log::warn!("building with uncommitted changes: {}", repo.uncommitted_changes);
    }

    let build = {
        let _span = tracing::info_span!("build_context").entered();
        build_metadata(&settings.build_args, now, policy.error_on_missing_arguments)?
    };

    Ok((collection.status, repo, build))
}

/// Run the whole pipeline. `now` is both the build date and the generation
/// date written into headers.
pub fn run<R: CommandRunner + ?Sized>(
    settings: &Settings,
    runner: &R,
    generator: &Generator,
    now: NaiveDateTime,
) -> Result<Report, BuildVersionError> {
    let (status, repository, build) = gather(settings, runner, now)?;

    let target = settings.declaration_path.clone().or_else(|| {
        locate::declaration_file(
            &settings.project_root,
            &settings.program_name,
            &settings.declaration_file,
        )
    });
    let declaration = match target {
        Some(path) => {
            let _span = tracing::info_span!("synthesize", path = %path.display()).entered();
            Some(synthesize(&path, &settings.type_name, generator, &now, &repository, &build)?)
        }
        None => {
            log::warn!(
                "program directory {} not found under {}",
                settings.program_name,
                settings.project_root.join(locate::LOGICAL_DIR).display()
            );
            None
        }
    };

    let global_path = settings
        .global_path
        .clone()
        .unwrap_or_else(|| locate::global_file(&settings.project_root, &settings.global_file));
    let global = {
        let _span = tracing::info_span!("patch", path = %global_path.display()).entered();
        patch(&global_path, &settings.type_name, generator, &repository, &build)?
    };
    if global == Patch::NotFound {
        log::warn!(
            "no variable of type {} declared in {}",
            settings.type_name,
            global_path.display()
        );
    }

    let report = Report { status, repository, build, declaration, global };
    if !report.initialized() {
        if settings.policy.error_if_no_initialization_target {
            return Err(BuildVersionError::NoInitializationTarget);
        }
        log::warn!("{}", BuildVersionError::NoInitializationTarget);
    }
    Ok(report)
}
