// THEORY:
// The `region` module is the spatial grouping layer. It takes the binary mask of a
// single frame and turns every connected patch of "on" pixels into a `Region`: the
// closed outline of that patch plus the two numbers the rest of the tracker cares
// about, its area and its centroid.
//
// Algorithm:
// 1.  **Seeding**: scan the mask in raster order. The first unvisited "on" pixel of a
//     patch is its top-left-most pixel, so its west neighbour is always background.
// 2.  **Labelling**: a stack-based flood fill over the 8 neighbours marks the whole
//     patch as visited so it is never seeded twice.
// 3.  **Tracing**: Moore neighbour tracing walks the outer boundary clockwise from the
//     seed, stopping when it is about to repeat its first step (Jacob's criterion).
//     Holes inside a patch are not traced; only the outer outline matters here.
// 4.  **Aggregation**: area is the polygon area of the outline (shoelace formula), so
//     a filled `n x n` square measures `(n - 1)^2`, the same as a contour area; the
//     centroid is the center of the outline's bounding box.
//
// Like the detector that calls it, this is a stateless utility with no memory of
// previous frames. Regions come out in discovery order, not sorted by size.

use image::GrayImage;

/// A pixel coordinate. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in pixels, inclusive of its first row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// The outline of one connected patch of mask pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Boundary pixels in clockwise order. The outline is closed: the last point
    /// connects back to the first.
    boundary: Vec<Point>,
    /// Cached polygon area of `boundary`.
    area: f64,
    /// Cached bounding box of `boundary`.
    bounding_box: BoundingBox,
}

impl Region {
    /// Builds a region from an already traced outline.
    pub fn from_boundary(boundary: Vec<Point>) -> Self {
        let area = polygon_area(&boundary);
        let bounding_box = bounding_box(&boundary);
        Self {
            boundary,
            area,
            bounding_box,
        }
    }

    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn centroid(&self) -> Point {
        self.bounding_box.center()
    }
}

/// Neighbour offsets in clockwise order (image coordinates), starting east.
const NEIGHBOURS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

struct MaskView<'a> {
    mask: &'a GrayImage,
    width: i32,
    height: i32,
}

impl<'a> MaskView<'a> {
    fn new(mask: &'a GrayImage) -> Self {
        Self {
            mask,
            width: mask.width() as i32,
            height: mask.height() as i32,
        }
    }

    fn is_on(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && point.x < self.width
            && point.y < self.height
            && self.mask.get_pixel(point.x as u32, point.y as u32)[0] != 0
    }

    fn index(&self, point: Point) -> usize {
        (point.y * self.width + point.x) as usize
    }
}

/// Finds the outer outline of every 8-connected patch of non-zero pixels.
pub fn find_regions(mask: &GrayImage) -> Vec<Region> {
    let view = MaskView::new(mask);
    let mut visited = vec![false; (view.width * view.height) as usize];
    let mut regions = Vec::new();

    for y in 0..view.height {
        for x in 0..view.width {
            let seed = Point::new(x, y);
            if visited[view.index(seed)] || !view.is_on(seed) {
                continue;
            }
            mark_patch(&view, seed, &mut visited);
            regions.push(Region::from_boundary(trace_boundary(&view, seed)));
        }
    }

    regions
}

fn mark_patch(view: &MaskView, seed: Point, visited: &mut [bool]) {
    let mut stack = vec![seed];
    visited[view.index(seed)] = true;

    while let Some(current) = stack.pop() {
        for (dx, dy) in NEIGHBOURS {
            let next = Point::new(current.x + dx, current.y + dy);
            if view.is_on(next) && !visited[view.index(next)] {
                visited[view.index(next)] = true;
                stack.push(next);
            }
        }
    }
}

/// Scans the 8 neighbours of `from` clockwise, starting at direction `start`.
fn next_on_neighbour(view: &MaskView, from: Point, start: usize) -> Option<(Point, usize)> {
    (0..8).map(|i| (start + i) % 8).find_map(|direction| {
        let (dx, dy) = NEIGHBOURS[direction];
        let candidate = Point::new(from.x + dx, from.y + dy);
        view.is_on(candidate).then_some((candidate, direction))
    })
}

fn trace_boundary(view: &MaskView, start: Point) -> Vec<Point> {
    let mut boundary = vec![start];
    let Some((second, first_heading)) = next_on_neighbour(view, start, WEST) else {
        // Isolated pixel.
        return boundary;
    };

    let mut current = second;
    let mut heading = first_heading;
    loop {
        boundary.push(current);
        // Resume the scan just past the background pixel examined last.
        let Some((next, next_heading)) = next_on_neighbour(view, current, (heading + 6) % 8) else {
            break;
        };
        if current == start && next == second {
            boundary.pop();
            break;
        }
        current = next;
        heading = next_heading;
    }

    boundary
}

fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

fn bounding_box(points: &[Point]) -> BoundingBox {
    let Some(first) = points.first() else {
        return BoundingBox::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}
