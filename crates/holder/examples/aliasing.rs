use holder::{SharedPtr, make_shared};

struct Node {
    name: String,
    weight: f64,
}

impl Drop for Node {
    fn drop(&mut self) {
        println!("Dropping node '{}'", self.name);
    }
}

fn main() {
    let mut node = make_shared(Node {
        name: "root".into(),
        weight: 0.5,
    });

    let weight = SharedPtr::project(&node, |node| &node.weight);
    println!("use count after projecting: {}", SharedPtr::use_count(&node));

    SharedPtr::reset(&mut node);
    println!(
        "weight after resetting the node: {} (use count {})",
        *weight,
        SharedPtr::use_count(&weight)
    );

    drop(weight);
    println!("done");
}
