use maze_tanks_core::{normalized, Number, Point};
use maze_tanks_system_collision::{polygon_collision, swept_circle_vs_polygon, Polygon};
use proptest::prelude::*;

fn rectangle_strategy() -> impl Strategy<Value = Polygon> {
    (
        -200_000i32..200_000,
        -200_000i32..200_000,
        -100i32..100,
        -100i32..100,
        5_000i32..60_000,
        5_000i32..60_000,
    )
        .prop_filter("direction must be non-zero", |(_, _, dx, dy, _, _)| {
            *dx != 0 || *dy != 0
        })
        .prop_map(|(x, y, dx, dy, width, length)| {
            let center = Point::new(Number::from_raw(x), Number::from_raw(y));
            let direction = normalized(Point::from_ints(dx, dy));
            Polygon::rotated_rectangle(
                center,
                direction,
                Number::from_raw(width),
                Number::from_raw(length),
            )
        })
}

proptest! {
    #[test]
    fn polygon_collision_is_symmetric(first in rectangle_strategy(), second in rectangle_strategy()) {
        let forward = polygon_collision(&first, &second);
        let backward = polygon_collision(&second, &first);
        prop_assert_eq!(forward.is_some(), backward.is_some());
        if let (Some(forward), Some(backward)) = (forward, backward) {
            prop_assert_eq!(forward.depth, backward.depth);
            prop_assert_eq!(forward.normal, -backward.normal);
            prop_assert!(forward.depth > Number::ZERO);
        }
    }

    #[test]
    fn polygon_collides_with_itself(polygon in rectangle_strategy()) {
        prop_assert!(polygon_collision(&polygon, &polygon).is_some());
    }

    #[test]
    fn swept_fraction_stays_in_unit_interval(
        polygon in rectangle_strategy(),
        x in -200_000i32..200_000,
        y in -200_000i32..200_000,
        vx in -100_000i32..100_000,
        vy in -100_000i32..100_000,
    ) {
        let position = Point::new(Number::from_raw(x), Number::from_raw(y));
        let velocity = Point::new(Number::from_raw(vx), Number::from_raw(vy));
        if let Some(hit) = swept_circle_vs_polygon(&polygon, position, velocity, Number::from_ratio(3, 100)) {
            prop_assert!(hit.fraction >= Number::ZERO);
            prop_assert!(hit.fraction <= Number::ONE);
        }
    }
}
