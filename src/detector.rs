//! Reference detector: geometry constants and the ordered list of sensor arrays.
//!
//! Two ring-packed QUPID arrays look at the xenon target from above and below.
//! Two veto systems of 10" PMTs surround the cryostat: a liquid-scintillator
//! veto (disabled in the reference configuration) and a water Cherenkov veto.
//! Each veto system has a top cap, a bottom cap and a side wall.

use crate::layout::{
    check_overlaps, mount_cylindrical, mount_planar, ArrayDecl, CapGrid, LayoutError, RingPacking,
    SensorIndex, SensorModel, SideGrid, Surface,
};
use crate::params::{ParameterError, ParameterStore, CM, M, MM};
use crate::settings::Settings;
use nalgebra::Vector3;
use tracing::{debug, info};

/// Primary array above the target
pub const TOP: &str = "top";
/// Primary array below the target
pub const BOTTOM: &str = "bottom";
/// Liquid-scintillator veto top cap
pub const LS_TOP: &str = "ls_top";
/// Liquid-scintillator veto bottom cap
pub const LS_BOTTOM: &str = "ls_bottom";
/// Liquid-scintillator veto side wall
pub const LS_SIDE: &str = "ls_side";
/// Water veto top cap
pub const WATER_TOP: &str = "water_top";
/// Water veto bottom cap
pub const WATER_BOTTOM: &str = "water_bottom";
/// Water veto side wall
pub const WATER_SIDE: &str = "water_side";

/// Sensors per row of the liquid-scintillator veto caps
pub const LS_CAP_ROWS: [usize; 5] = [1, 3, 5, 3, 1];
/// Sensors per row of the water veto top cap
pub const WATER_TOP_ROWS: [usize; 3] = [3, 3, 3];
/// Sensors per row of the water veto bottom cap
pub const WATER_BOTTOM_ROWS: [usize; 5] = [5, 5, 5, 5, 5];

/// Parameters read by [`declare_arrays`].
pub const REQUIRED_PARAMETERS: [&str; 32] = [
    "PSArrayOuterRadius",
    "QUPIDBaseRadius",
    "QUPIDsMinimumAllowedDistance",
    "QUPIDBodyOffset",
    "QUPIDBaseOffset",
    "TopQUPIDWindowZ",
    "BottomQUPIDWindowZ",
    "PMTWindowOuterRadius",
    "PMTBodyOffset",
    "PMTBaseOffset",
    "NbLSTopPMTs",
    "NbLSBottomPMTs",
    "NbLSSidePMTs",
    "NbLSSidePMTRows",
    "NbLSSidePMTColumns",
    "LSTopPMTWindowZ",
    "LSBottomPMTWindowZ",
    "LSSidePMTWindowR",
    "LSTopPMTDistance",
    "LSBottomPMTDistance",
    "LSSidePMTRowDistance",
    "NbWaterTopPMTs",
    "NbWaterBottomPMTs",
    "NbWaterSidePMTs",
    "NbWaterSidePMTRows",
    "NbWaterSidePMTColumns",
    "WaterTopPMTWindowZ",
    "WaterBottomPMTWindowZ",
    "WaterSidePMTWindowR",
    "WaterTopPMTDistance",
    "WaterBottomPMTDistance",
    "WaterSidePMTRowDistance",
];

/// Geometry constants of the reference detector.
///
/// Lengths are in mm. Derived values only reference names defined above them.
pub fn default_parameters() -> Result<ParameterStore, ParameterError> {
    let mut p = ParameterStore::builder();

    // Laboratory and water tank
    p.define("LabHeight", 12. * M)?;
    p.define("LabRadius", 6. * M)?;
    p.define("WaterTankThickness", 2. * MM)?;
    p.define("WaterTankOuterRadius", 5. * M)?;
    p.derive("WaterTankInnerRadius", &["WaterTankOuterRadius", "WaterTankThickness"], |v| {
        v[0] - v[1]
    })?;

    // Fiducial volume
    p.define("FiducialDriftLength", 200.385 * CM)?;
    p.define("FiducialRadius", 82.1 * CM)?;
    p.define("LinearFiducialCut", 13. * CM)?;

    // QUPID
    p.define("QUPIDWindowOuterRadius", 37. * MM)?;
    p.define("QUPIDWindowOuterHeight", 26.57 * MM)?;
    p.define("QUPIDBodyOuterRadius", 35.5 * MM)?;
    p.define("QUPIDBodyHeight", 44.93 * MM)?;
    p.define("QUPIDBaseRadius", 36. * MM)?;
    p.define("QUPIDBaseThickness", 5. * MM)?;
    p.define("QUPIDsMinimumAllowedDistance", 0.5 * MM)?;
    p.define("PhotoSensorsVoltageDividerSpace", 1. * CM)?;
    p.sum(
        "PhotoSensorsHeight",
        &[
            "PhotoSensorsVoltageDividerSpace",
            "QUPIDWindowOuterHeight",
            "QUPIDBodyHeight",
            "QUPIDBaseThickness",
        ],
    )?;
    p.derive("QUPIDWindowZCut", &["QUPIDWindowOuterRadius", "QUPIDWindowOuterHeight"], |v| {
        v[0] - v[1]
    })?;
    p.derive("QUPIDBodyOffset", &["QUPIDBodyHeight", "QUPIDWindowZCut"], |v| {
        0.5 * v[0] - v[1]
    })?;
    p.derive(
        "QUPIDBaseOffset",
        &["QUPIDBodyOffset", "QUPIDBodyHeight", "QUPIDBaseThickness"],
        |v| v[0] + 0.5 * (v[1] + v[2]),
    )?;

    // Cryostat and grid stack
    p.define("OuterCryostatThickness", 1. * CM)?;
    p.define("VacuumThickness", 10. * CM)?;
    p.define("InnerCryostatThickness", 1. * CM)?;
    p.define("OuterLXeThickness", 3. * CM)?;
    p.define("PTFEThickness", 1. * CM)?;
    p.derive("GridRingWidth", &["PTFEThickness"], |v| v[0] - 0.2 * CM)?;
    p.define("TopGridsHeight", 0.6 * CM)?;
    p.define("BottomGridsHeight", 0.8 * CM)?;
    p.define("PhotoSensorsToScreeningMesh", 2. * CM)?;
    p.derive("ScreeningMeshToAnode", &["TopGridsHeight"], |v| v[0] + 0.1 * CM)?;
    p.derive("AnodeToBelowLiquidMesh", &["TopGridsHeight"], |v| v[0] + 0.1 * CM)?;
    p.derive("CathodeToVeryBottomMesh", &["BottomGridsHeight"], |v| v[0] + 0.7 * CM)?;
    p.derive("VeryBottomMeshToPhotoSensors", &["BottomGridsHeight"], |v| v[0] + 1.0 * CM)?;
    p.derive(
        "BellHeight",
        &[
            "PhotoSensorsHeight",
            "PhotoSensorsToScreeningMesh",
            "ScreeningMeshToAnode",
            "AnodeToBelowLiquidMesh",
        ],
        |v| v[0] + v[1] + v[2] + 0.5 * v[3],
    )?;
    p.sum(
        "OuterCryostatOuterRadius",
        &[
            "OuterCryostatThickness",
            "VacuumThickness",
            "InnerCryostatThickness",
            "OuterLXeThickness",
            "PTFEThickness",
            "LinearFiducialCut",
            "FiducialRadius",
        ],
    )?;

    // TPC and primary arrays
    p.sum("TPCInnerRadius", &["LinearFiducialCut", "FiducialRadius"])?;
    p.derive("TPCOuterRadius", &["TPCInnerRadius", "PTFEThickness"], |v| v[0] + v[1])?;
    p.sum("PSArrayOuterRadius", &["TPCInnerRadius"])?;
    p.sum("GridsOuterRadius", &["TPCInnerRadius", "GridRingWidth"])?;
    p.derive(
        "SensitiveLXeHeight",
        &["FiducialDriftLength", "LinearFiducialCut", "AnodeToBelowLiquidMesh"],
        |v| v[0] + 2. * v[1] + 0.5 * v[2],
    )?;
    // Window planes in the detector frame
    p.define("TopQUPIDWindowZ", 58.2 * CM)?;
    p.define("BottomQUPIDWindowZ", -54.2 * CM)?;

    // 10" PMT
    p.define("PMTWindowOuterRadius", 126.5 * MM)?;
    p.define("PMTWindowTopZ", 85. * MM)?;
    p.define("PMTBodyOuterRadius", 51. * MM)?;
    p.define("PMTBodyHeight", 42. * MM)?;
    p.define("PMTBaseOuterRadius", 60. * MM)?;
    p.define("PMTBaseHeight", 62. * MM)?;
    p.derive("PMTBodyOffset", &["PMTWindowTopZ", "PMTBodyHeight"], |v| {
        v[0] + 0.5 * v[1]
    })?;
    p.derive(
        "PMTBaseOffset",
        &["PMTWindowTopZ", "PMTBodyHeight", "PMTBaseHeight"],
        |v| v[0] + v[1] + 0.5 * v[2],
    )?;

    // Liquid-scintillator veto, disabled
    p.define("NbLSTopPMTs", 0.)?;
    p.define("NbLSBottomPMTs", 0.)?;
    p.define("NbLSSidePMTRows", 0.)?;
    p.define("NbLSSidePMTColumns", 0.)?;
    p.define("NbLSSidePMTs", 0.)?;
    p.sum("NbLSPMTs", &["NbLSTopPMTs", "NbLSBottomPMTs", "NbLSSidePMTs"])?;
    p.define("LSTopPMTWindowZ", 195. * CM)?;
    p.define("LSBottomPMTWindowZ", -195. * CM)?;
    p.define("LSSidePMTWindowR", 170. * CM)?;
    p.define("LSTopPMTDistance", 80. * CM)?;
    p.define("LSBottomPMTDistance", 80. * CM)?;
    p.define("LSSidePMTRowDistance", 75. * CM)?;

    // Water veto
    p.define("NbWaterTopPMTs", 0.)?;
    p.define("NbWaterBottomPMTs", 25.)?;
    p.define("NbWaterSidePMTRows", 4.)?;
    p.define("NbWaterSidePMTColumns", 12.)?;
    p.derive("NbWaterSidePMTs", &["NbWaterSidePMTRows", "NbWaterSidePMTColumns"], |v| {
        v[0] * v[1]
    })?;
    p.sum("NbWaterPMTs", &["NbWaterTopPMTs", "NbWaterBottomPMTs", "NbWaterSidePMTs"])?;
    p.define("WaterTopPMTWindowZ", 440. * CM)?;
    p.define("WaterBottomPMTWindowZ", -440. * CM)?;
    p.define("WaterSidePMTWindowR", 470. * CM)?;
    p.define("WaterTopPMTDistance", 160. * CM)?;
    p.define("WaterBottomPMTDistance", 160. * CM)?;
    p.define("WaterSidePMTRowDistance", 250. * CM)?;

    p.build(&REQUIRED_PARAMETERS)
}

/// Packing inputs shared by the two primary arrays.
pub fn primary_packing(params: &ParameterStore) -> Result<RingPacking, LayoutError> {
    RingPacking::new(
        params.try_get("PSArrayOuterRadius")?,
        params.try_get("QUPIDBaseRadius")?,
        params.try_get("QUPIDsMinimumAllowedDistance")?,
    )
}

/// QUPID dimensions used by the primary arrays.
pub fn qupid_model(params: &ParameterStore) -> Result<SensorModel, LayoutError> {
    Ok(SensorModel {
        name: "QUPID".to_string(),
        footprint_radius: params.try_get("QUPIDBaseRadius")?,
        body_offset: params.try_get("QUPIDBodyOffset")?,
        base_offset: params.try_get("QUPIDBaseOffset")?,
    })
}

/// 10" PMT dimensions used by both veto systems.
pub fn pmt_model(params: &ParameterStore) -> Result<SensorModel, LayoutError> {
    Ok(SensorModel {
        name: "R7081".to_string(),
        footprint_radius: params.try_get("PMTWindowOuterRadius")?,
        body_offset: params.try_get("PMTBodyOffset")?,
        base_offset: params.try_get("PMTBaseOffset")?,
    })
}

/// Sensor count declared for a veto array, checked against the grid's capacity.
///
/// Returns `None` when the array is disabled.
fn declared_count(
    params: &ParameterStore,
    array: &str,
    key: &str,
    capacity: impl FnOnce() -> Result<usize, LayoutError>,
) -> Result<Option<usize>, LayoutError> {
    let declared = params.count(key)?;
    if declared == 0 {
        debug!("Array {array} is disabled ({key} = 0)");
        return Ok(None);
    }
    let capacity = capacity()?;
    if capacity != declared {
        return Err(LayoutError::CountMismatch {
            array: array.to_string(),
            declared,
            capacity,
        });
    }
    Ok(Some(declared))
}

fn cap_array(
    params: &ParameterStore,
    name: &str,
    surface: Surface,
    rows: &[usize],
    count_key: &str,
    spacing_key: &str,
    z_key: &str,
) -> Result<ArrayDecl, LayoutError> {
    let spacing = params.try_get(spacing_key)?;
    let grid = CapGrid::new(rows.to_vec(), spacing, spacing)?;
    let placements = match declared_count(params, name, count_key, || Ok(grid.count()))? {
        Some(_) => mount_planar(
            &grid.place_all(),
            surface,
            Vector3::new(0.0, 0.0, params.try_get(z_key)?),
        ),
        None => Vec::new(),
    };
    Ok(ArrayDecl {
        name: name.to_string(),
        surface,
        model: pmt_model(params)?,
        placements,
        required: false,
    })
}

fn side_array(
    params: &ParameterStore,
    name: &str,
    count_key: &str,
    rows_key: &str,
    columns_key: &str,
    spacing_key: &str,
    radius_key: &str,
) -> Result<ArrayDecl, LayoutError> {
    let grid = || -> Result<SideGrid, LayoutError> {
        SideGrid::new(
            params.count(rows_key)?,
            params.count(columns_key)?,
            params.try_get(spacing_key)?,
            params.try_get(radius_key)?,
        )
        .map_err(|e| match e {
            LayoutError::NonPhysical(msg) => LayoutError::NonPhysical(format!("{name}: {msg}")),
            e => e,
        })
    };
    let placements = match declared_count(params, name, count_key, || Ok(grid()?.count()))? {
        Some(_) => mount_cylindrical(&grid()?, Vector3::zeros()),
        None => Vec::new(),
    };
    Ok(ArrayDecl {
        name: name.to_string(),
        surface: Surface::SideWall,
        model: pmt_model(params)?,
        placements,
        required: false,
    })
}

/// All sensor arrays of the detector in index order.
///
/// The two primary arrays share a single ring packing and differ only in
/// their window plane and orientation. Their size is checked against the
/// sensor ceiling of `settings` before any placement is generated.
pub fn declare_arrays(params: &ParameterStore, settings: &Settings) -> Result<Vec<ArrayDecl>, LayoutError> {
    let packing = primary_packing(params)?;
    if let Err(total) = packing.count_within(settings.max_sensors / 2) {
        return Err(LayoutError::TooManySensors {
            total: total.saturating_mul(2),
            ceiling: settings.max_sensors,
        });
    }
    let disc = packing.place();
    let qupid = qupid_model(params)?;
    debug!("{} QUPIDs per primary array", disc.len());

    let top = ArrayDecl {
        name: TOP.to_string(),
        surface: Surface::TopCap,
        model: qupid.clone(),
        placements: mount_planar(
            &disc,
            Surface::TopCap,
            Vector3::new(0.0, 0.0, params.try_get("TopQUPIDWindowZ")?),
        ),
        required: true,
    };
    let bottom = ArrayDecl {
        name: BOTTOM.to_string(),
        surface: Surface::BottomCap,
        model: qupid,
        placements: mount_planar(
            &disc,
            Surface::BottomCap,
            Vector3::new(0.0, 0.0, params.try_get("BottomQUPIDWindowZ")?),
        ),
        required: true,
    };

    Ok(vec![
        top,
        bottom,
        cap_array(
            params,
            LS_TOP,
            Surface::TopCap,
            &LS_CAP_ROWS,
            "NbLSTopPMTs",
            "LSTopPMTDistance",
            "LSTopPMTWindowZ",
        )?,
        cap_array(
            params,
            LS_BOTTOM,
            Surface::BottomCap,
            &LS_CAP_ROWS,
            "NbLSBottomPMTs",
            "LSBottomPMTDistance",
            "LSBottomPMTWindowZ",
        )?,
        side_array(
            params,
            LS_SIDE,
            "NbLSSidePMTs",
            "NbLSSidePMTRows",
            "NbLSSidePMTColumns",
            "LSSidePMTRowDistance",
            "LSSidePMTWindowR",
        )?,
        cap_array(
            params,
            WATER_TOP,
            Surface::TopCap,
            &WATER_TOP_ROWS,
            "NbWaterTopPMTs",
            "WaterTopPMTDistance",
            "WaterTopPMTWindowZ",
        )?,
        cap_array(
            params,
            WATER_BOTTOM,
            Surface::BottomCap,
            &WATER_BOTTOM_ROWS,
            "NbWaterBottomPMTs",
            "WaterBottomPMTDistance",
            "WaterBottomPMTWindowZ",
        )?,
        side_array(
            params,
            WATER_SIDE,
            "NbWaterSidePMTs",
            "NbWaterSidePMTRows",
            "NbWaterSidePMTColumns",
            "WaterSidePMTRowDistance",
            "WaterSidePMTWindowR",
        )?,
    ])
}

/// Build the global sensor index of the detector.
pub fn build_index(params: &ParameterStore, settings: &Settings) -> Result<SensorIndex, LayoutError> {
    let index = SensorIndex::build(declare_arrays(params, settings)?, settings)?;

    if settings.check_overlaps {
        let packing = primary_packing(params)?;
        for array in index.arrays().iter().filter(|a| !a.is_empty()) {
            let min_separation = if array.name == TOP || array.name == BOTTOM {
                2.0 * packing.footprint_radius() + packing.clearance()
            } else {
                2.0 * array.model.footprint_radius
            };
            check_overlaps(array, min_separation, settings.overlap_tolerance)?;
        }
    }

    for array in index.arrays() {
        info!(
            "{}: {} sensors in [{}, {})",
            array.name,
            array.len(),
            array.range.start,
            array.range.end
        );
    }
    Ok(index)
}
