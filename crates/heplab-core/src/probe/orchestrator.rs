//! Drives any [`DependencyProbe`] through the fixed detection state machine.
//!
//! Stage order: initialize → veto check → dependency gate → search chain
//! (manual → tools → auto, falling through only on `NotFound`) → extract →
//! save → finalize. This is the single place where the mandatory flag turns
//! a failure into "abort startup" vs "continue without the feature".

use heplab_schema::{DetectionStatus, PackageId, ProbeOutcome};

use crate::probe::{
    DependencyProbe, ProbeContext, fastsim::FastsimProbe, histo::HistoProbe, jetclu::JetcluProbe,
    toolchain::ToolchainProbe, zlib::ZlibProbe,
};
use crate::reporter::Reporter;

/// Resolve a package name to its concrete probe.
pub fn make_probe(package: PackageId) -> Box<dyn DependencyProbe> {
    match package {
        PackageId::Cxx => Box::new(ToolchainProbe::default()),
        PackageId::Histo => Box::new(HistoProbe::default()),
        PackageId::Jetclu => Box::new(JetcluProbe::default()),
        PackageId::Fastsim => Box::new(FastsimProbe::new(PackageId::Fastsim)),
        PackageId::FastsimTuned => Box::new(FastsimProbe::new(PackageId::FastsimTuned)),
        PackageId::Zlib => Box::new(ZlibProbe::default()),
    }
}

/// Run one probe to a terminal [`DetectionStatus`], emitting exactly one
/// reporter line for the package.
pub fn run_probe<R: Reporter + ?Sized>(
    probe: &mut dyn DependencyProbe,
    ctx: &mut ProbeContext<'_>,
    mandatory: bool,
    reporter: &R,
) -> DetectionStatus {
    let package = probe.package();
    let mut diagnostics: Vec<String> = Vec::new();

    // Failure consequence shared by every stage past the veto check.
    let fail = |reason: &str, diagnostics: &[String], reporter: &R| {
        if mandatory {
            for line in diagnostics {
                tracing::error!("{package}: {line}");
            }
            reporter.failure(package, reason);
            DetectionStatus::Fatal
        } else {
            tracing::debug!("{package}: {reason}");
            reporter.disabled(package, reason);
            DetectionStatus::Disabled
        }
    };

    if !probe.initialize(ctx) {
        return fail("initialization failed", &diagnostics, reporter);
    }

    // Vetoes apply to optional packages only; a veto on a mandatory one is
    // ignored and detection proceeds.
    if !mandatory && probe.is_vetoed(ctx) {
        ctx.snapshot.record_mut(package).clear();
        reporter.disabled(package, "disabled by user");
        return DetectionStatus::Disabled;
    }

    if !probe.dependencies_installed(ctx) {
        ctx.snapshot.record_mut(package).clear();
        reporter.disabled(package, "required dependencies are missing");
        return DetectionStatus::Disabled;
    }

    // Search chain: manual wins, tools next, auto last. Only NotFound falls
    // through; Found proceeds and Issue stops with failure semantics.
    let mut detection = probe.manual_detection(ctx);
    diagnostics.push(format!("manual detection: {}", detection.message));
    if detection.outcome == ProbeOutcome::NotFound {
        detection = probe.tools_detection(ctx);
        diagnostics.push(format!("tools detection: {}", detection.message));
    }
    if detection.outcome == ProbeOutcome::NotFound {
        detection = probe.auto_detection(ctx);
        diagnostics.push(format!("auto detection: {}", detection.message));
    }

    match detection.outcome {
        ProbeOutcome::Found => {}
        ProbeOutcome::Issue => {
            ctx.snapshot.record_mut(package).clear();
            return fail(&detection.message, &diagnostics, reporter);
        }
        ProbeOutcome::Deactivated => {
            ctx.snapshot.record_mut(package).clear();
            reporter.deactivated(package);
            return DetectionStatus::Disabled;
        }
        ProbeOutcome::NotFound => {
            ctx.snapshot.record_mut(package).clear();
            return fail("package not found", &diagnostics, reporter);
        }
    }

    if !probe.extract_info(ctx) {
        diagnostics.push("introspection of the found candidate failed".into());
        ctx.snapshot.record_mut(package).clear();
        return fail("found but unusable", &diagnostics, reporter);
    }

    if !probe.save_info(ctx) {
        ctx.snapshot.record_mut(package).clear();
        return fail("could not record detection results", &diagnostics, reporter);
    }

    if !probe.finalize(ctx) {
        ctx.snapshot.record_mut(package).clear();
        return fail("final validation failed", &diagnostics, reporter);
    }

    let version = ctx.snapshot.record(package).version.clone();
    reporter.enabled(package, &version);
    DetectionStatus::Enabled
}

/// Run the full detection pass over every known package, in dependency-safe
/// order. Returns the single "configuration OK, continue startup" flag.
pub fn run_all<R: Reporter + ?Sized>(ctx: &mut ProbeContext<'_>, reporter: &R) -> bool {
    let mut ok = true;
    for package in PackageId::ALL {
        let mut probe = make_probe(package);
        let status = run_probe(probe.as_mut(), ctx, package.mandatory(), reporter);
        if !status.ok() {
            ok = false;
        }
    }
    ok
}
