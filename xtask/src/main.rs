use xflags::xflags;
use xshell::{cmd, Shell};

xflags! {
    cmd xtask {
        cmd testmatrix {}
    }
}

fn main() -> xshell::Result<()> {
    match Xtask::from_env_or_exit().subcommand {
        XtaskCmd::Testmatrix(Testmatrix {}) => test_matrix(),
    }
}

fn test_matrix() -> xshell::Result<()> {
    let sh = Shell::new()?;

    // Any combination of features should work and run tests.
    cmd!(sh, "cargo hack test -p randquik --feature-powerset").run()?;
    // ... and also be warning-free
    cmd!(
        sh,
        "cargo hack clippy -p randquik --feature-powerset -- --deny warnings"
    )
    .run()?;

    let cross_targets = [
        "aarch64-unknown-linux-gnu", // for neon
        "i686-unknown-linux-gnu",    // for 32-bit compatibility in the x86 modules
        "s390x-unknown-linux-gnu",   // for big endian
        "x86_64-unknown-linux-gnu",  // for ssse3 and avx2
    ];
    for target in cross_targets {
        // Run clippy for each target to catch issues in cfg'd out code, with
        // -Dwarnings so they won't just be drowned in a sea of output.
        cmd!(
            sh,
            "cargo clippy --target {target} -p randquik --all-features -- --deny warnings"
        )
        .run()?;

        // Run tests both with and without crate features to exercise static
        // vs. dynamic feature detection.
        for feat in ["--no-default-features --features std", "--all-features"] {
            let feat_args = feat.split(' ').collect::<Vec<_>>();
            // Overriding RUSTFLAGS for `cross test` prevents the container
            // picking up RUSTFLAGS meant for the host (e.g., from
            // $CARGO_HOME/config.toml) which can break stuff.
            cmd!(
                sh,
                "cargo bin cross test --target {target} -p randquik {feat_args...}"
            )
            .env("RUSTFLAGS", "")
            .run()?;
        }
    }

    // x86_64-unknown-none is an x86 target without std, so it can't *run*
    // the tests but it's useful as a smoke test for no_std support,
    // especially w.r.t. the use of std for runtime feature detection.
    cmd!(
        sh,
        "cargo clippy --target x86_64-unknown-none -p randquik --no-default-features -- --deny warnings"
    )
    .run()?;

    Ok(())
}
