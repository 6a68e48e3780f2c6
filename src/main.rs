use std::error::Error;

use log::info;
use nalgebra::Vector3;

use orbit_sim::bodies::catalog;
use orbit_sim::orbital::elements::period;
use orbit_sim::orbital::maneuvers::circular_velocity;
use orbit_sim::{EngineConfig, GeoPoint, OrbitalElements, Satellite, Simulation};

const LEO_RADIUS: f64 = 6771.0; // km (~393 km altitude)
const GEO_RADIUS: f64 = 42_164.0; // km

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    // Optional YAML config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_yaml(&std::fs::read_to_string(&path)?)?,
        None => EngineConfig::default(),
    };

    // -----------------------------------------------------------------------
    // Scenario: ISS-like LEO satellite about Earth, Moon and Sun perturbing
    // -----------------------------------------------------------------------
    let mut sim = Simulation::new(config)?;
    sim.use_catalog_ephemeris(catalog::EARTH, &[catalog::MOON, catalog::SUN])?;

    let earth = sim.central_body(catalog::EARTH)?.clone();
    let inc = 51.6_f64.to_radians();
    let v = circular_velocity(LEO_RADIUS, earth.mu);
    let sat = Satellite::new(
        1,
        catalog::EARTH,
        Vector3::new(LEO_RADIUS, 0.0, 0.0),
        Vector3::new(0.0, v * inc.cos(), v * inc.sin()),
    )
    .with_ballistics(420.0, 2.2, 2.5);
    sim.add_satellite(sat)?;

    println!();
    println!("====================================================================");
    println!("  ORBIT SIMULATION: LEO to GEO transfer");
    println!("====================================================================");
    println!();
    print_elements("Initial orbit", &sim.orbital_elements(1)?);

    // -----------------------------------------------------------------------
    // Ground track and passes over Cape Canaveral before the transfer
    // -----------------------------------------------------------------------
    let orbit_period = period(LEO_RADIUS, earth.mu);
    let track = sim.ground_track(1, orbit_period, 13)?;
    println!("  Ground track (one orbit)");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  {:>8}  {:>9}  {:>10}  {:>9}", "t (s)", "lat (deg)", "lon (deg)", "alt (km)");
    for p in &track.value {
        println!(
            "  {:>8.1}  {:>9.3}  {:>10.3}  {:>9.2}",
            p.time, p.latitude, p.longitude, p.altitude
        );
    }
    println!();

    let cape = GeoPoint::new(28.5, -80.6);
    let passes = sim.pass_windows(&cape, 1, 86_400.0)?;
    println!("  Passes over ({:.1}, {:.1}) in the next 24 h", cape.latitude, cape.longitude);
    println!("  ──────────────────────────────────────────────────────────────────");
    for w in &passes.value {
        println!(
            "  AOS {:>8.0} s   LOS {:>8.0} s   {:>5.0} s   max el {:>5.1} deg{}",
            w.aos,
            w.los,
            w.duration,
            w.max_elevation,
            if w.possibly_truncated { "  (truncated)" } else { "" }
        );
    }
    if passes.value.is_empty() {
        println!("  none");
    }
    println!();

    // -----------------------------------------------------------------------
    // Hohmann transfer to GEO radius
    // -----------------------------------------------------------------------
    let plan = sim.plan_hohmann(1, GEO_RADIUS, 0.0)?;
    println!("  Transfer plan");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Burn 1:        {:>8.4} km/s   at r = {:>9.1} km",
        plan.burn1.magnitude,
        plan.burn1.position.norm()
    );
    println!(
        "  Burn 2:        {:>8.4} km/s   at r = {:>9.1} km",
        plan.burn2.magnitude,
        plan.burn2.position.norm()
    );
    println!(
        "  Total:         {:>8.4} km/s   transfer time {:.1} s ({:.2} h)",
        plan.total_delta_v,
        plan.transfer_time,
        plan.transfer_time / 3600.0
    );
    println!();

    let nodes = sim.materialize(&plan)?;
    info!("scheduled {} maneuver nodes", nodes.len());

    // -----------------------------------------------------------------------
    // Fly it
    // -----------------------------------------------------------------------
    println!("  Flight");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  {:>8}  {:>10}  {:>9}  {:>8}", "t (s)", "r (km)", "v (km/s)", "ecc");
    println!("  {}", "─".repeat(44));

    let dt = 60.0;
    let end = plan.transfer_time + 3600.0;
    let mut step = 0usize;
    while sim.time() < end {
        let report = sim.tick(dt)?;
        for (sat, node) in &report.executed {
            println!("  -- sat {} executed node {} at t={:.1} s", sat, node, report.time);
        }
        for (sat, err) in &report.failures {
            println!("  !! sat {}: {}", sat, err);
        }
        step += 1;
        if step % 30 == 0 || !report.executed.is_empty() {
            let s = sim.satellite(1)?;
            let ecc = sim.orbital_elements(1).map(|e| e.ecc).unwrap_or(f64::NAN);
            println!(
                "  {:>8.0}  {:>10.1}  {:>9.4}  {:>8.5}",
                sim.time(),
                s.position.norm(),
                s.velocity.norm(),
                ecc
            );
        }
    }
    println!();
    print_elements("Final orbit", &sim.orbital_elements(1)?);
    println!("  Simulation: {} ticks, dt={} s", step, dt);
    println!("====================================================================");
    println!();
    Ok(())
}

fn print_elements(title: &str, el: &OrbitalElements) {
    let angle = |a: Option<f64>| a.map(|v| format!("{:>8.3}", v.to_degrees())).unwrap_or_else(|| "   undef".into());
    println!("  {}", title);
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  SMA:           {:>10.2} km   Ecc:          {:>10.6}",
        el.sma, el.ecc
    );
    println!(
        "  Inc:           {:>10.3} deg  RAAN:         {} deg",
        el.inc.to_degrees(),
        angle(el.raan)
    );
    println!(
        "  AoP:           {} deg    True anomaly: {:>10.3} deg",
        angle(el.argp),
        el.true_anom.to_degrees()
    );
    println!("  Period:        {:>10.1} s", el.period);
    println!();
}
