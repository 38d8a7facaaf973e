use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use extport_core::{
    ClassParser, ClassRecord, DirectoryCache, MemoryCache, NamespaceMapping, NamespaceResolver,
    QueryAnswer,
};
use tempfile::TempDir;

fn resolver() -> NamespaceResolver {
    NamespaceResolver::new(NamespaceMapping::new().query("App", |name: &str| {
        QueryAnswer::Class(ClassRecord::new(format!("app/{}.js", name.replace('.', "/"))))
    }))
}

/// A controller-heavy application file with `classes` defined classes
fn application_source(classes: usize) -> String {
    let mut source = String::from(
        "Ext.application({\n    name: 'App',\n    controllers: ['Main', 'Nav'],\n    stores: ['Items'],\n    autoCreateViewport: true\n});\n",
    );
    for i in 0..classes {
        source.push_str(&format!(
            "Ext.define('App.view.Panel{i}', {{\n    extend: 'App.view.Base',\n    requires: ['App.util.Format', 'App.util.Dates{i}'],\n    uses: ['App.view.Popup{i}'],\n    initComponent: function() {{\n        this.callParent(arguments);\n    }}\n}});\n"
        ));
    }
    source
}

fn bench_cold_vs_cached(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");

    for classes in [10, 100] {
        let source = application_source(classes);

        let cold = ClassParser::builder(resolver()).no_cache().build().unwrap();
        group.bench_with_input(BenchmarkId::new("cold_parse", classes), &source, |b, source| {
            b.iter(|| cold.parse(black_box(source)).unwrap())
        });

        let memory = ClassParser::builder(resolver())
            .cache(MemoryCache::new())
            .build()
            .unwrap();
        memory.parse(&source).unwrap();
        group.bench_with_input(BenchmarkId::new("memory_hit", classes), &source, |b, source| {
            b.iter(|| memory.parse(black_box(source)).unwrap())
        });

        let temp_dir = TempDir::new().unwrap();
        let disk = ClassParser::builder(resolver())
            .cache(DirectoryCache::new(temp_dir.path()))
            .build()
            .unwrap();
        disk.parse(&source).unwrap();
        group.bench_with_input(BenchmarkId::new("directory_hit", classes), &source, |b, source| {
            b.iter(|| disk.parse(black_box(source)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cold_vs_cached);
criterion_main!(benches);
