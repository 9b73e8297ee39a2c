//! Walkthrough dry run.
//!
//! Loads one configured model through the full pipeline against the headless
//! backend, prints progress and the load manifest, toggles the configured
//! effects and disposes everything again.
//!
//! ```text
//! walkthrough <config.json> <model-id>
//! ```

use anyhow::{Context, bail};
use valevision::effects::EffectKind;
use valevision::pipeline::{CancellationToken, LoadProgress};
use valevision::{HeadlessBackend, Viewer, ViewerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(model_id)) = (args.next(), args.next()) else {
        bail!("usage: walkthrough <config.json> <model-id>");
    };

    let config = ViewerConfig::from_path(&config_path)
        .with_context(|| format!("reading configuration {config_path}"))?;
    let model = config.model(&model_id)?.clone();

    let mut viewer = Viewer::from_config(HeadlessBackend::new(), &config)?;
    println!(
        "Loading '{}' from {} (profile {:?}, quality {})",
        model.id,
        config.transport_root,
        viewer.profile(),
        config.quality_for(&model)
    );

    let cancel = CancellationToken::new();
    let mut last_reported = -1.0_f32;
    let mut sink = |p: &LoadProgress| {
        if p.percent - last_reported >= 5.0 || p.is_complete() {
            last_reported = p.percent;
            println!(
                "[{:>5.1}%] {}/{} {:<22} {}",
                p.percent,
                p.stage_index + 1,
                p.total_stages,
                p.stage.label(),
                p.current_label
            );
        }
    };

    let mut handle = viewer
        .load_configured(&model, &config.conventions, &mut sink, &cancel)
        .await
        .with_context(|| format!("loading model '{}'", model.id))?;

    println!("\n{}: {} meshes", handle.title(), handle.meshes.len());
    println!("{}", serde_json::to_string_pretty(&handle.manifest)?);

    for kind in EffectKind::ALL {
        let state = handle.effect(kind);
        match &state.last_error {
            Some(reason) => println!("{kind:?}: disabled ({reason})"),
            None => println!("{kind:?}: {:?}", state.phase),
        }
    }

    // Toggle SSAO once to exercise the reconfigure path.
    if handle.effect(EffectKind::Ssao).is_active() {
        viewer.dispose_effect(&mut handle, EffectKind::Ssao);
        let state = viewer.attach_effect(&mut handle, EffectKind::Ssao, config.quality_for(&model));
        println!("SSAO re-attached: {:?}", state.phase);
    }

    viewer.dispose_scene(handle);
    let stats = viewer.backend().stats();
    println!(
        "Disposed. Scenes created/disposed: {}/{}; imports: {}",
        stats.scenes_created, stats.scenes_disposed, stats.imports
    );
    Ok(())
}
