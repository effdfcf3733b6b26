//! A small scene: a courier carries a parcel, decides to drop it, and the
//! detach is applied at the end of the tick.
//!
//! Run with: `RUST_LOG=debug cargo run --example drop_demo`

use magick_engine::prelude::*;

#[derive(Debug, Default)]
struct Name(String);

/// Carrying capacity. A loader is a more specific kind of carrier.
#[derive(Debug, Default)]
struct Carrier {
    patience: u32,
}

#[derive(Debug, Default)]
struct Loader {
    patience: u32,
}

fn main() -> Result<(), anyhow::Error> {
    init_logging("info");

    let config = TickConfig::from_json_str(r#"{ "trace_trees": true }"#)?;
    let mut tick_loop = TickLoop::try_new(World::new(), config)?;
    let hardpoint = tick_loop.register_attachment()?;

    let world = tick_loop.world_mut();
    let name = world.register_kind::<Name>("name")?;
    let carrier = world.register_kind::<Carrier>("carrier")?;
    let loader = world.register_subkind::<Loader>("loader", carrier)?;

    // Archetypes are values: the courier template is derived from the base
    // one without touching it.
    let base = factory::build_archetype(
        world.registry(),
        [name.into(), ComponentDescriptor::with_init(carrier, |c: &mut Carrier| c.patience = 2)],
    )?;
    let courier = base.add(world.registry(), [hardpoint.into()])?;
    let forklift = courier
        .remove(world.registry(), [carrier.into()])?
        .add(
            world.registry(),
            [ComponentDescriptor::with_init(loader, |l: &mut Loader| l.patience = 0)],
        )?;
    // Collapsing the loader back into a plain carrier.
    let generic = forklift.replace(world.registry(), [carrier.into()])?;
    let templates = [
        ("base", &base),
        ("courier", &courier),
        ("forklift", &forklift),
        ("generic", &generic),
    ];
    for (label, archetype) in templates {
        let kinds: Vec<&str> = archetype.kinds().map(|k| world.registry().name(k)).collect();
        println!("{label:>8}: {kinds:?}");
    }

    let courier_entity = factory::instantiate(world, &courier)?;
    let parcel = factory::build(
        world,
        [ComponentDescriptor::with_init(name, |n: &mut Name| n.0 = "parcel".to_owned())],
    )?;

    tick_loop.enqueue(Attach {
        host: courier_entity,
        child: parcel,
    });

    // Wait while patience lasts, then drop.
    let tree = Selector::new()
        .with(Condition::new(|ctx| {
            ctx.world
                .get::<Carrier>(ctx.root)
                .is_some_and(|c| ctx.tick < u64::from(c.patience))
        }))
        .with(DropItem);
    tick_loop.trees_mut().insert(courier_entity, tree);

    for _ in 0..4 {
        let report = tick_loop.tick();
        let held = tick_loop
            .world()
            .get::<Hardpoint>(courier_entity)
            .and_then(|h| h.attached);
        println!(
            "tick {}: delivered {} event(s), courier holds {:?}",
            tick_loop.tick_count(),
            report.delivered,
            held
        );
    }

    Ok(())
}
