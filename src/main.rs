//! Block Swarm entry point
//!
//! The browser build is driven through `block_swarm::wasm::SwarmHandle`.
//! Natively this runs a headless session and prints the board as it goes.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::cell::RefCell;
    use std::rc::Rc;

    use block_swarm::consts::GRID_RADIUS;
    use block_swarm::sim::{BlocksManager, ResultAnimationKind, StateChange, Status};
    use block_swarm::Properties;

    const DT: f32 = 1.0 / 60.0;

    /// Host script: (second, intent, flag)
    const SCRIPT: &[(f32, &str, bool)] = &[
        (0.0, "showVisual", false),
        (0.0, "start", false),
        (20.0, "success2", false),
        (40.0, "start", false),
        (55.0, "fail", false),
    ];
    const RUN_SECONDS: f32 = 70.0;

    pub fn run(seed: u64) {
        log::info!("Block Swarm (headless) starting with seed {}", seed);

        let mut manager = BlocksManager::new(seed, Properties::default());
        let restarted = Rc::new(RefCell::new(false));

        manager.signals.state.add(|change: &StateChange| {
            log::info!(
                "State: {:?} (result {:?}, level {})",
                change.status,
                change.result,
                change.level
            );
        });
        manager.signals.animation_end.add(|kind: &ResultAnimationKind| {
            log::info!("Result animation ended: {:?}", kind);
        });
        let flag = Rc::clone(&restarted);
        manager.signals.state.add(move |change: &StateChange| {
            if change.status == Status::Restart {
                *flag.borrow_mut() = true;
            }
        });

        let mut script = SCRIPT.iter().peekable();
        let mut elapsed = 0.0f32;
        let mut last_print = -1i64;

        while elapsed < RUN_SECONDS {
            while let Some((at, intent, flag)) = script.peek() {
                if *at > elapsed {
                    break;
                }
                if let Err(e) = manager.set(intent, *flag) {
                    log::warn!("Rejected intent {}: {}", intent, e);
                }
                script.next();
            }

            manager.update(DT);
            elapsed += DT;

            let second = elapsed as i64;
            if second != last_print && second % 5 == 0 {
                last_print = second;
                println!(
                    "t={:>3}s {:?} cycle={} blocks={}",
                    second,
                    manager.status(),
                    manager.cycle_index(),
                    manager.live_count()
                );
                println!("{}", render_board(&manager));
            }
        }

        if *restarted.borrow() {
            log::info!("Session went through at least one restart");
        }
    }

    /// One character per board tile: `#` occupied, `+` reserved, `!` error, `.` free
    fn render_board(manager: &BlocksManager) -> String {
        let snapshot = manager.snapshot();
        let mut out = String::new();
        for row in -GRID_RADIUS..=GRID_RADIUS {
            for col in -GRID_RADIUS..=GRID_RADIUS {
                let at = glam::IVec2::new(col, row);
                let error = snapshot
                    .blocks
                    .iter()
                    .any(|b| b.is_error_block && b.coords == Some(at));
                let c = if error {
                    '!'
                } else if snapshot.occupied.contains(&at) {
                    '#'
                } else if snapshot.reserved.contains(&at) {
                    '+'
                } else {
                    '.'
                };
                out.push(c);
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    headless::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is in block_swarm::wasm, this is just to satisfy the compiler
}
