//! Real Berlin locations from OpenStreetMap, plus one far away.

use route_planner::geo::Coordinate;

pub const ALEXANDERPLATZ: Coordinate = Coordinate {
    lat: 52.520008,
    lng: 13.404954,
};

pub const BRANDENBURG_GATE: Coordinate = Coordinate {
    lat: 52.516275,
    lng: 13.377704,
};

pub const POTSDAMER_PLATZ: Coordinate = Coordinate {
    lat: 52.509663,
    lng: 13.376481,
};

pub const TEMPELHOFER_FELD: Coordinate = Coordinate {
    lat: 52.473700,
    lng: 13.401900,
};

pub const MARIENPLATZ_MUNICH: Coordinate = Coordinate {
    lat: 48.137154,
    lng: 11.576124,
};
