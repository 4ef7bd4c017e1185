mod common;

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use common::{assert_coordinates_close, init_logger};
use massplane::{
    axes::{BranchMasses, MassEntry},
    coordinates::Coordinates,
    AnyMassPlane, AxisVariable, GraphMassPlane, MassPlane, MassPlaneError,
};

fn symmetric() -> MassPlane {
    MassPlane::from_string("T2tt", "[[x, y], [x, y]]").unwrap()
}

#[test]
fn test_independent_branches() {
    init_logger();
    let plane = MassPlane::from_string("T5", "[[x], [y]]").unwrap();
    assert_eq!(plane.xvars(), vec![AxisVariable::X, AxisVariable::Y]);

    let masses = plane.get_particle_masses(&Coordinates::xy(500.0, 100.0));
    assert_eq!(
        masses,
        vec![BranchMasses::masses(&[500.0]), BranchMasses::masses(&[100.0])]
    );
    assert_eq!(
        plane.get_xy_values(&masses, None).unwrap(),
        Some(Coordinates::xy(500.0, 100.0))
    );
}

#[test]
fn test_symmetric_round_trip() {
    let plane = symmetric();
    for (x, y) in [(300.0, 0.0), (800.0, 250.0), (1200.5, 600.25)] {
        let masses = plane.get_particle_masses(&Coordinates::xy(x, y));
        assert_eq!(masses.len(), 2);
        let back = plane.get_xy_values(&masses, None).unwrap().unwrap();
        assert_coordinates_close(&back, &Coordinates::xy(x, y), 1e-9);
    }
}

#[test]
fn test_repetition_and_display() {
    let repeated = MassPlane::from_string("T2tt", "2*[[x, y]]").unwrap();
    assert_eq!(repeated, symmetric());
    assert_eq!(repeated.to_string(), "2*[[x, y]]");
    assert_eq!(repeated.branches().len(), 2);

    let asymmetric = MassPlane::from_string("T6", "[[x, y], [x, 'y']]").unwrap();
    assert_eq!(asymmetric, symmetric());

    // literals print the same however they were written
    let constant = MassPlane::from_string("TChi", "[[x, 60.0], [x, 60]]").unwrap();
    assert_eq!(constant.to_string(), "2*[[x, 60]]");
}

#[test]
fn test_descriptor_round_trip() {
    for descriptor in [
        "[[x, y], [x, y]]",
        "[[x, 0.5*x + 0.5*y, y], [x, y]]",
        "[[x, (y, z)], *]",
        "3*[[x, y - 10]]",
    ] {
        let plane = MassPlane::from_string("T", descriptor).unwrap();
        let reparsed = MassPlane::from_string("T", &plane.to_string()).unwrap();
        assert_eq!(reparsed, plane, "{descriptor} -> {plane}");
    }
}

#[test]
fn test_rejected_points() {
    let plane = symmetric();

    // parent lighter than its daughter
    let masses = vec![
        BranchMasses::masses(&[100.0, 500.0]),
        BranchMasses::masses(&[100.0, 500.0]),
    ];
    assert_eq!(plane.get_xy_values(&masses, None).unwrap(), None);

    // negative mass
    let masses = vec![
        BranchMasses::masses(&[500.0, -10.0]),
        BranchMasses::masses(&[500.0, -10.0]),
    ];
    assert_eq!(plane.get_xy_values(&masses, None).unwrap(), None);

    assert_eq!(
        plane.get_xy_values(&[BranchMasses::masses(&[500.0, 100.0])], None),
        Err(MassPlaneError::DimensionMismatch {
            expected: 2,
            found: 1
        })
    );
}

#[test]
fn test_cross_branch_agreement() {
    let plane = symmetric();

    let close = vec![
        BranchMasses::masses(&[500.0, 100.0]),
        BranchMasses::masses(&[500.01, 100.0]),
    ];
    let merged = plane.get_xy_values(&close, None).unwrap().unwrap();
    assert_eq!(merged.get(AxisVariable::X), Some(500.0));

    let apart = vec![
        BranchMasses::masses(&[500.0, 100.0]),
        BranchMasses::masses(&[510.0, 100.0]),
    ];
    assert_eq!(plane.get_xy_values(&apart, None).unwrap(), None);
}

#[test]
fn test_intermediate_vertex_round_trip() {
    let plane = MassPlane::from_string(
        "T6bbWW",
        "[[x, 0.5*x + 0.5*y, y], [x, 0.5*x + 0.5*y, y]]",
    )
    .unwrap();
    let masses = plane.get_particle_masses(&Coordinates::xy(800.0, 200.0));
    assert_eq!(masses[0], BranchMasses::masses(&[800.0, 500.0, 200.0]));
    let back = plane.get_xy_values(&masses, None).unwrap().unwrap();
    assert_coordinates_close(&back, &Coordinates::xy(800.0, 200.0), 1e-6);

    // the middle mass is 20 GeV off the line
    let off = vec![
        BranchMasses::masses(&[800.0, 520.0, 200.0]),
        BranchMasses::masses(&[800.0, 520.0, 200.0]),
    ];
    assert_eq!(plane.get_xy_values(&off, None).unwrap(), None);
}

#[test]
fn test_wildcard_branch() {
    let plane = MassPlane::from_string("T2tt", "[[x, y], '*']").unwrap();
    assert_eq!(plane.to_string(), "[[x, y], *]");

    let masses = plane.get_particle_masses(&Coordinates::xy(500.0, 100.0));
    assert_eq!(masses[1], BranchMasses::Wildcard);

    let masses = vec![BranchMasses::masses(&[500.0, 100.0]), BranchMasses::Wildcard];
    assert_eq!(
        plane.get_xy_values(&masses, None).unwrap(),
        Some(Coordinates::xy(500.0, 100.0))
    );
}

#[test]
fn test_widths() {
    let plane = MassPlane::from_string("THSCPM1b", "[[x, (y, z)], [x, (y, z)]]").unwrap();
    assert_eq!(
        plane.xvars(),
        vec![AxisVariable::X, AxisVariable::Y, AxisVariable::Z]
    );

    let point: Coordinates = [
        (AxisVariable::X, 500.0),
        (AxisVariable::Y, 100.0),
        (AxisVariable::Z, 1e-10),
    ]
    .into_iter()
    .collect();
    let masses = plane.get_particle_masses(&point);
    assert_eq!(
        masses[0],
        BranchMasses::entries([MassEntry::Mass(500.0), MassEntry::MassWidth(100.0, 1e-10)])
    );

    let back = plane.get_xy_values(&masses, None).unwrap().unwrap();
    assert_relative_eq!(back.get(AxisVariable::Z).unwrap(), 1e-10, max_relative = 1e-9);

    // widths given apart from the masses
    let masses = vec![
        BranchMasses::masses(&[500.0, 100.0]),
        BranchMasses::masses(&[500.0, 100.0]),
    ];
    let widths = vec![vec![None, Some(1e-10)], vec![None, Some(1e-10)]];
    let back = plane.get_xy_values(&masses, Some(widths.as_slice())).unwrap().unwrap();
    assert_relative_eq!(back.get(AxisVariable::Z).unwrap(), 1e-10, max_relative = 1e-9);

    // no widths at all: masses only
    let back = plane.get_xy_values(&masses, None).unwrap().unwrap();
    assert_coordinates_close(&back, &Coordinates::xy(500.0, 100.0), 1e-9);
}

#[test]
fn test_descriptor_errors() {
    assert!(matches!(
        MassPlane::from_string("T2", "[[x, q]]"),
        Err(MassPlaneError::UnknownSymbol(_))
    ));
    assert!(matches!(
        MassPlane::from_string("T2", "[[x, y]"),
        Err(MassPlaneError::DescriptorParse(_))
    ));
    assert_eq!(
        MassPlane::from_string("T2", "[[x + y], [x + y]]").err(),
        Some(MassPlaneError::Underconstrained {
            branch: 0,
            nvars: 2,
            neqs: 1
        })
    );
}

#[test]
fn test_graph_plane() {
    let plane = GraphMassPlane::from_string("TGQ", "{0: 'x', 1: 'y', 2: '0.5*x + 0.5*y'}").unwrap();
    assert_eq!(plane.xvars(), vec![AxisVariable::X, AxisVariable::Y]);

    let masses = plane.get_particle_masses(&Coordinates::xy(1000.0, 200.0));
    assert_eq!(masses.len(), 3);
    assert_eq!(masses[&2], MassEntry::Mass(600.0));
    let back = plane.get_xy_values(&masses).unwrap().unwrap();
    assert_coordinates_close(&back, &Coordinates::xy(1000.0, 200.0), 1e-6);

    let missing: BTreeMap<usize, MassEntry> =
        [(0, MassEntry::Mass(1000.0)), (1, MassEntry::Mass(200.0))].into();
    assert!(plane.get_xy_values(&missing).is_err());
}

#[test]
fn test_any_mass_plane() {
    let plane = AnyMassPlane::from_string("T2tt", "[[x, y], [x, y]]").unwrap();
    assert!(matches!(plane, AnyMassPlane::Branches(_)));
    assert_eq!(plane.txname(), "T2tt");

    let plane = AnyMassPlane::from_string("TGQ", "{0: 'x', 1: 'y'}").unwrap();
    assert!(matches!(plane, AnyMassPlane::Graph(_)));
    assert_eq!(plane.xvars(), vec![AxisVariable::X, AxisVariable::Y]);
}
