use brickgraph::BrickGraph;
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_queries_see_the_same_rows() {
    let graph = Arc::new(BrickGraph::load("tests/data/building.ttl").expect("load graph"));
    let query = "SELECT ?x ?c WHERE { ?x rdf:type ?t . ?t rdfs:subClassOf+ ?c } ORDER BY ?x ?c";
    let expected = graph.query(query, false).expect("baseline query");
    assert!(!expected.is_empty());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let graph = Arc::clone(&graph);
            thread::spawn(move || {
                (0..20)
                    .map(|_| graph.query(query, false).expect("query in thread"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for table in handle.join().expect("thread panicked") {
            assert_eq!(table, expected);
        }
    }
}
