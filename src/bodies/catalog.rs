//! Preset solar-system bodies and a low-precision ephemeris built from their
//! canonical Keplerian orbits.
//!
//! Canonical orbits are expressed in the J2000 ecliptic frame relative to the
//! parent body, with angles in degrees and the mean anomaly given at the
//! reference epoch (simulated time zero). Planets are parented to the Sun and
//! natural satellites to their planet.

use nalgebra::{Rotation3, Vector3};

use super::{BodyId, CentralBody, PerturbingBody};
use crate::error::EngineError;
use crate::orbital::elements::{true_from_mean, OrbitalElements};
use crate::physics::atmosphere::ExponentialAtmosphere;

pub const SUN: BodyId = 10;
pub const MERCURY: BodyId = 199;
pub const VENUS: BodyId = 299;
pub const EARTH: BodyId = 399;
pub const MOON: BodyId = 301;
pub const MARS: BodyId = 499;
pub const JUPITER: BodyId = 599;
pub const SATURN: BodyId = 699;
pub const URANUS: BodyId = 799;
pub const NEPTUNE: BodyId = 899;
pub const PLUTO: BodyId = 999;

pub const PHOBOS: BodyId = 401;
pub const DEIMOS: BodyId = 402;
pub const IO: BodyId = 501;
pub const EUROPA: BodyId = 502;
pub const GANYMEDE: BodyId = 503;
pub const CALLISTO: BodyId = 504;
pub const MIMAS: BodyId = 601;
pub const ENCELADUS: BodyId = 602;
pub const TETHYS: BodyId = 603;
pub const DIONE: BodyId = 604;
pub const RHEA: BodyId = 605;
pub const TITAN: BodyId = 606;
pub const IAPETUS: BodyId = 608;
pub const ARIEL: BodyId = 701;
pub const UMBRIEL: BodyId = 702;
pub const TITANIA: BodyId = 703;
pub const OBERON: BodyId = 704;
pub const MIRANDA: BodyId = 705;
pub const TRITON: BodyId = 801;
pub const PROTEUS: BodyId = 802;
pub const NEREID: BodyId = 803;
pub const CHARON: BodyId = 901;
pub const NIX: BodyId = 902;
pub const HYDRA: BodyId = 903;
pub const KERBEROS: BodyId = 904;
pub const STYX: BodyId = 905;

/// Mean obliquity of the ecliptic at J2000, degrees.
pub const OBLIQUITY_J2000: f64 = 23.439_291_1;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Keplerian orbit of a catalog body about its parent (km, degrees).
#[derive(Debug, Clone, Copy)]
pub struct CanonicalOrbit {
    pub a: f64,
    pub e: f64,
    pub i: f64,
    pub raan: f64,
    pub argp: f64,
    pub mean_anomaly: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: BodyId,
    pub name: &'static str,
    pub parent: Option<BodyId>,
    pub gm: f64,                   // km^3/s^2
    pub radius: f64,               // km, equatorial
    pub j2: Option<f64>,
    pub rotation_deg_per_day: f64,
    pub prime_meridian_deg: f64,
    pub orbit: Option<CanonicalOrbit>,
}

impl CatalogEntry {
    pub fn rotation_rate(&self) -> f64 {
        self.rotation_deg_per_day.to_radians() / SECONDS_PER_DAY
    }

    /// Builds the immutable central-body record, located at the origin.
    pub fn to_central_body(&self) -> Result<CentralBody, EngineError> {
        let mut body = CentralBody::new(self.id, self.name, self.gm, self.radius)?
            .with_rotation(self.rotation_rate(), self.prime_meridian_deg.to_radians());
        body.j2 = self.j2;
        if self.id == EARTH {
            body = body.with_atmosphere(ExponentialAtmosphere::earth());
        }
        Ok(body)
    }
}

/// Natural satellite without a J2 term, orbiting `parent`. Rotation is
/// `(prime meridian deg, deg/day)`.
const fn moon(
    id: BodyId,
    name: &'static str,
    parent: BodyId,
    gm: f64,
    radius: f64,
    rotation: (f64, f64),
    orbit: Option<CanonicalOrbit>,
) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        parent: Some(parent),
        gm,
        radius,
        j2: None,
        rotation_deg_per_day: rotation.1,
        prime_meridian_deg: rotation.0,
        orbit,
    }
}

const fn orbit(a: f64, e: f64, i: f64, raan: f64, argp: f64, mean_anomaly: f64) -> Option<CanonicalOrbit> {
    Some(CanonicalOrbit { a, e, i, raan, argp, mean_anomaly })
}

pub static BODIES: &[CatalogEntry] = &[
    CatalogEntry {
        id: SUN,
        name: "Sun",
        parent: None,
        gm: 132_712_440_041.939_38,
        radius: 695_700.0,
        j2: None,
        rotation_deg_per_day: 14.184_4,
        prime_meridian_deg: 84.176,
        orbit: None,
    },
    CatalogEntry {
        id: MERCURY,
        name: "Mercury",
        parent: Some(SUN),
        gm: 22_031.868_55,
        radius: 2_439.7,
        j2: Some(6.0e-5),
        rotation_deg_per_day: 6.138_502_5,
        prime_meridian_deg: 329.546_9,
        orbit: orbit(57_909_050.0, 0.2056, 7.005, 48.331, 29.124, 174.796),
    },
    CatalogEntry {
        id: VENUS,
        name: "Venus",
        parent: Some(SUN),
        gm: 324_858.592,
        radius: 6_051.8,
        j2: Some(4.458e-6),
        rotation_deg_per_day: -1.481_368_8,
        prime_meridian_deg: 160.20,
        orbit: orbit(108_208_000.0, 0.0067, 3.3947, 76.680, 54.884, 50.416),
    },
    CatalogEntry {
        id: EARTH,
        name: "Earth",
        parent: Some(SUN),
        gm: 398_600.435_507,
        radius: 6_378.136_6,
        j2: Some(1.082_626_68e-3),
        rotation_deg_per_day: 360.985_623_5,
        prime_meridian_deg: 190.147,
        orbit: orbit(149_598_023.0, 0.0167, 0.0, -11.260_64, 114.207_83, 358.617),
    },
    CatalogEntry {
        id: MOON,
        name: "Moon",
        parent: Some(EARTH),
        gm: 4_902.800_066,
        radius: 1_737.4,
        j2: Some(2.032e-4),
        rotation_deg_per_day: 13.176_358_15,
        prime_meridian_deg: 38.321_3,
        orbit: orbit(384_400.0, 0.0549, 5.145, 125.08, 318.15, 115.365_4),
    },
    CatalogEntry {
        id: MARS,
        name: "Mars",
        parent: Some(SUN),
        gm: 42_828.375_214,
        radius: 3_396.19,
        j2: Some(1.960_45e-3),
        rotation_deg_per_day: 350.891_982_26,
        prime_meridian_deg: 176.630,
        orbit: orbit(227_939_200.0, 0.0935, 1.850, 49.558, 286.502, 19.373),
    },
    CatalogEntry {
        id: JUPITER,
        name: "Jupiter",
        parent: Some(SUN),
        gm: 126_686_531.9,
        radius: 71_492.0,
        j2: Some(0.014_696),
        rotation_deg_per_day: 870.536,
        prime_meridian_deg: 284.95,
        orbit: orbit(778_570_000.0, 0.0489, 1.303, 100.464, 273.867, 20.020),
    },
    CatalogEntry {
        id: SATURN,
        name: "Saturn",
        parent: Some(SUN),
        gm: 37_931_207.8,
        radius: 60_268.0,
        j2: Some(0.016_298),
        rotation_deg_per_day: 810.793_902_4,
        prime_meridian_deg: 38.90,
        orbit: orbit(1_433_530_000.0, 0.0565, 2.485, 113.665, 339.392, 317.020),
    },
    CatalogEntry {
        id: URANUS,
        name: "Uranus",
        parent: Some(SUN),
        gm: 5_793_951.3,
        radius: 25_559.0,
        j2: None,
        rotation_deg_per_day: -501.160_092_8,
        prime_meridian_deg: 203.81,
        orbit: orbit(2_875_040_000.0, 0.0463, 0.773, 74.006, 96.998, 142.238_6),
    },
    CatalogEntry {
        id: NEPTUNE,
        name: "Neptune",
        parent: Some(SUN),
        gm: 6_835_103.1,
        radius: 24_764.0,
        j2: None,
        rotation_deg_per_day: 541.139_775_7,
        prime_meridian_deg: 249.978,
        orbit: orbit(4_504_450_000.0, 0.0097, 1.770, 131.784, 273.187, 256.228),
    },
    CatalogEntry {
        id: PLUTO,
        name: "Pluto",
        parent: Some(SUN),
        gm: 869.613_817,
        radius: 1_188.3,
        j2: None,
        rotation_deg_per_day: -56.362_522_5,
        prime_meridian_deg: 302.695,
        orbit: orbit(5_906_440_628.0, 0.2488, 17.16, 110.299, 113.834, 14.53),
    },
    // Mars
    moon(PHOBOS, "Phobos", MARS, 0.000_711_2, 11.266_7, (35.187_744_4, 1_128.844_759_28), orbit(9_376.0, 0.0151, 1.075, 49.2, 150.057, 177.4)),
    moon(DEIMOS, "Deimos", MARS, 0.000_098_5, 6.2, (79.399_329_54, 285.161_888_99), orbit(23_463.2, 0.00033, 1.788, 316.65, 260.729, 53.2)),
    // Jupiter
    moon(IO, "Io", JUPITER, 595.6, 1_821.6, (200.39, 203.488_953_8), orbit(421_700.0, 0.0041, 0.036, 43.977, 84.129, 171.016)),
    moon(EUROPA, "Europa", JUPITER, 320.0, 1_560.8, (36.022, 101.374_723_5), orbit(671_034.0, 0.009, 0.465, 219.106, 88.970, 29.298)),
    moon(GANYMEDE, "Ganymede", JUPITER, 988.7, 2_634.1, (44.064, 50.317_608_1), orbit(1_070_412.0, 0.0013, 0.177, 63.552, 192.417, 192.417)),
    moon(CALLISTO, "Callisto", JUPITER, 717.0, 2_410.3, (259.51, 21.571_071_5), orbit(1_882_709.0, 0.007, 0.192, 298.848, 52.643, 52.643)),
    // Saturn
    moon(MIMAS, "Mimas", SATURN, 2.502, 198.2, (333.46, 381.994_555), orbit(185_539.0, 0.0196, 1.574, 66.2, 160.4, 275.3)),
    moon(ENCELADUS, "Enceladus", SATURN, 7.210, 252.1, (6.32, 262.731_899_6), orbit(238_042.0, 0.0047, 0.009, 0.0, 119.5, 57.0)),
    moon(TETHYS, "Tethys", SATURN, 41.21, 531.1, (8.95, 190.697_908_5), orbit(294_672.0, 0.0001, 1.091, 273.0, 335.3, 0.0)),
    moon(DIONE, "Dione", SATURN, 73.116, 561.4, (357.6, 131.534_931_6), orbit(377_415.0, 0.0022, 0.028, 0.0, 116.0, 212.0)),
    moon(RHEA, "Rhea", SATURN, 153.94, 763.8, (235.16, 79.690_047_8), orbit(527_108.0, 0.001, 0.345, 133.7, 44.3, 31.5)),
    moon(TITAN, "Titan", SATURN, 8_978.0, 2_574.7, (186.585_5, 22.576_976_8), orbit(1_221_870.0, 0.0288, 0.348_54, 78.6, 78.3, 11.7)),
    moon(IAPETUS, "Iapetus", SATURN, 120.5, 734.5, (355.2, 4.537_957_2), orbit(3_560_820.0, 0.0283, 15.47, 86.5, 254.5, 74.8)),
    // Uranus
    moon(ARIEL, "Ariel", URANUS, 86.0, 578.9, (156.22, -142.835_668_1), orbit(190_900.0, 0.001, 0.0, 0.0, 83.3, 119.8)),
    moon(UMBRIEL, "Umbriel", URANUS, 81.5, 584.7, (108.05, -86.868_892_3), orbit(266_000.0, 0.004, 0.1, 195.5, 157.5, 258.3)),
    moon(TITANIA, "Titania", URANUS, 228.2, 788.9, (77.74, -41.351_431_6), orbit(436_300.0, 0.001, 0.1, 26.4, 202.0, 53.2)),
    moon(OBERON, "Oberon", URANUS, 192.4, 761.4, (6.77, -26.739_493_2), orbit(583_400.0, 0.001, 0.1, 30.5, 182.4, 139.7)),
    moon(MIRANDA, "Miranda", URANUS, 4.4, 235.8, (30.70, -254.690_689_2), orbit(129_900.0, 0.001, 4.4, 100.7, 155.6, 72.4)),
    // Neptune
    moon(TRITON, "Triton", NEPTUNE, 1_427.6, 1_353.4, (296.53, -61.257_263_7), orbit(354_800.0, 0.0, 157.3, 178.1, 0.0, 63.0)),
    moon(PROTEUS, "Proteus", NEPTUNE, 0.105, 210.0, (0.0, 0.0), orbit(117_600.0, 0.0, 0.0, 0.0, 0.0, 276.8)),
    moon(NEREID, "Nereid", NEPTUNE, 0.021, 170.0, (254.06, 1_222.844_120_9), orbit(5_513_900.0, 0.751, 5.1, 319.5, 296.8, 318.5)),
    // Pluto
    moon(CHARON, "Charon", PLUTO, 101.4, 606.0, (0.0, 0.0), orbit(19_591.4, 0.0, 96.145, 223.046, 0.0, 0.0)),
    moon(NIX, "Nix", PLUTO, 0.003, 25.0, (0.0, 0.0), orbit(48_694.0, 0.002, 96.2, 223.1, 0.0, 0.0)),
    moon(HYDRA, "Hydra", PLUTO, 0.005, 32.5, (0.0, 0.0), orbit(64_738.0, 0.005, 96.4, 223.2, 0.0, 0.0)),
    moon(KERBEROS, "Kerberos", PLUTO, 0.001, 12.0, (0.0, 0.0), orbit(57_783.0, 0.003, 96.3, 223.15, 0.0, 0.0)),
    moon(STYX, "Styx", PLUTO, 0.000_5, 8.0, (0.0, 0.0), orbit(42_656.0, 0.005, 96.1, 223.0, 0.0, 0.0)),
];

pub fn entry(id: BodyId) -> Option<&'static CatalogEntry> {
    BODIES.iter().find(|b| b.id == id)
}

fn lookup(id: BodyId) -> Result<&'static CatalogEntry, EngineError> {
    entry(id).ok_or(EngineError::CentralBodyNotFound { id })
}

pub fn central_body(id: BodyId) -> Result<CentralBody, EngineError> {
    lookup(id)?.to_central_body()
}

/// Ecliptic J2000 to Earth mean equator J2000.
pub fn ecliptic_to_equatorial(v: &Vector3<f64>) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), OBLIQUITY_J2000.to_radians()) * v
}

/// State of `id` relative to its parent at simulated time `t` (ecliptic frame).
pub fn state_about_parent(id: BodyId, t: f64) -> Result<(Vector3<f64>, Vector3<f64>), EngineError> {
    let body = lookup(id)?;
    let (Some(parent_id), Some(orbit)) = (body.parent, body.orbit) else {
        return Ok((Vector3::zeros(), Vector3::zeros()));
    };
    let mu = lookup(parent_id)?.gm + body.gm;
    let mean_motion = (mu / orbit.a.powi(3)).sqrt();
    let mean = orbit.mean_anomaly.to_radians() + mean_motion * t;
    let nu = true_from_mean(mean, orbit.e)?;
    let elements = OrbitalElements::new(
        orbit.a,
        orbit.e,
        orbit.i.to_radians(),
        orbit.raan.to_radians(),
        orbit.argp.to_radians(),
        nu,
        mu,
    )?;
    elements.to_state_vector(mu)
}

/// State of `id` relative to the root of the catalog (the Sun), ecliptic frame.
pub fn state_about_root(id: BodyId, t: f64) -> Result<(Vector3<f64>, Vector3<f64>), EngineError> {
    let mut pos = Vector3::zeros();
    let mut vel = Vector3::zeros();
    let mut current = Some(id);
    while let Some(cur) = current {
        let (p, v) = state_about_parent(cur, t)?;
        pos += p;
        vel += v;
        current = lookup(cur)?.parent;
    }
    Ok((pos, vel))
}

/// Central body record and perturbing-body snapshot at simulated time `t`.
///
/// All positions share one inertial frame; for an Earth-centred simulation that
/// frame is the Earth mean equator, otherwise the ecliptic.
pub fn snapshot(
    center: BodyId,
    perturbers: &[BodyId],
    t: f64,
) -> Result<(CentralBody, Vec<PerturbingBody>), EngineError> {
    let to_frame = |v: Vector3<f64>| {
        if center == EARTH {
            ecliptic_to_equatorial(&v)
        } else {
            v
        }
    };

    let (cpos, cvel) = state_about_root(center, t)?;
    let central = central_body(center)?.with_state(to_frame(cpos), to_frame(cvel));

    let mut bodies = Vec::with_capacity(perturbers.len());
    for &id in perturbers.iter().filter(|&&id| id != center) {
        let (pos, vel) = state_about_root(id, t)?;
        bodies.push(PerturbingBody {
            id,
            mu: lookup(id)?.gm,
            position: to_frame(pos),
            velocity: to_frame(vel),
        });
    }
    Ok((central, bodies))
}
