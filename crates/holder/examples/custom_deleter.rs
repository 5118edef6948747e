use holder::{SharedPtr, UniquePtr};
use std::ptr::NonNull;

#[derive(Debug, Default)]
struct Point {
    x: i32,
    y: i32,
    label: char,
}

fn delete_point(point: NonNull<Point>) {
    println!("Custom deleter");
    drop(unsafe { Box::from_raw(point.as_ptr()) });
}

fn main() {
    let raw = Box::into_raw(Box::new(Point::default()));
    let mut point = unsafe { UniquePtr::from_raw_with_deleter(raw, delete_point) };

    *point = Point {
        x: 1,
        y: 2,
        label: 'a',
    };
    println!("{} ({}, {})", point.label, point.x, point.y);
    println!("{point:?}");

    let mut a = UniquePtr::new(10);
    let mut b = UniquePtr::new(20);
    println!("a: {}, b: {}", *a, *b);

    UniquePtr::swap(&mut a, &mut b);
    println!("a: {}, b: {}", *a, *b);

    // The deleter moves into the shared pointer's record, and runs when the last owner is dropped
    let shared = SharedPtr::from_unique(point);
    let copy = shared.clone();
    println!("use count: {}", SharedPtr::use_count(&copy));
}
